// bbox_sync/server/src/server/sync_controller.rs
use crate::concurrent::bounding_box_cache::CacheSnapshot;
use crate::core::types::{BoundingBox, DimensionId, ObserverId};
use crate::entities::observer::{DeliveredSet, ObserverState};
use crate::network::transport::{log_send_error, DeltaTransport};
use crate::operational::monitoring::metrics;
use crate::world::registry::DimensionRegistry;
use ahash::AHashMap;
use std::ops::AddAssign;
use tracing::{debug, info, trace};

/// Counts of what one synchronization pass handed to the transport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub adds_sent: usize,
    pub add_failures: usize,
    pub removes_sent: usize,
    pub remove_failures: usize,
}

impl AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.adds_sent += other.adds_sent;
        self.add_failures += other.add_failures;
        self.removes_sent += other.removes_sent;
        self.remove_failures += other.remove_failures;
    }
}

/// Tracks, per subscribed observer, which owners it already holds and hands
/// the transport whatever is missing.
///
/// Additions are polled: each tick diffs the dimension cache against the
/// delivered-set, and an owner whose member set was replaced since it was
/// sent goes out again as a fresh add. Removals are pushed through [`broadcast_removal`], since
/// absence cannot be recovered by a set difference.
///
/// [`broadcast_removal`]: ObserverSyncController::broadcast_removal
#[derive(Default)]
pub struct ObserverSyncController {
    observers: AHashMap<ObserverId, ObserverState>,
}

impl ObserverSyncController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `observer` with empty delivered-sets. A repeated join drops
    /// whatever the previous session had delivered.
    pub fn subscribe(&mut self, observer: ObserverId, dimension: DimensionId) {
        info!("[Sync] Observer {} subscribed in {}", observer, dimension);
        self.observers.insert(observer.clone(), ObserverState::new(observer, dimension));
        metrics::update_observer_count(self.observers.len());
    }

    pub fn unsubscribe(&mut self, observer: &ObserverId) -> bool {
        let removed = self.observers.remove(observer);
        if let Some(state) = &removed {
            info!("[Sync] Observer {} unsubscribed, discarding {} delivered owners", observer, state.delivered_count());
        }
        metrics::update_observer_count(self.observers.len());
        removed.is_some()
    }

    /// Moves the observer; its delivered-sets are kept per dimension.
    pub fn change_dimension(&mut self, observer: &ObserverId, dimension: DimensionId) -> bool {
        match self.observers.get_mut(observer) {
            Some(state) => {
                debug!("[Sync] Observer {} moved {} -> {}", observer, state.dimension(), dimension);
                state.set_dimension(dimension);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.observers.clear();
        metrics::update_observer_count(0);
    }

    pub fn is_subscribed(&self, observer: &ObserverId) -> bool {
        self.observers.contains_key(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn observer(&self, observer: &ObserverId) -> Option<&ObserverState> {
        self.observers.get(observer)
    }

    pub fn delivered(&self, observer: &ObserverId, dimension: &DimensionId) -> Option<&DeliveredSet> {
        self.observers.get(observer).and_then(|state| state.delivered_in(dimension))
    }

    /// One synchronization tick for every subscribed observer. Each dimension
    /// cache is snapshotted once per tick.
    pub fn synchronize(&mut self, registry: &DimensionRegistry, transport: &dyn DeltaTransport) -> SyncReport {
        let mut snapshots: AHashMap<DimensionId, CacheSnapshot> = AHashMap::new();
        let mut report = SyncReport::default();
        for state in self.observers.values_mut() {
            let snapshot = snapshots
                .entry(state.dimension().clone())
                .or_insert_with_key(|dimension| registry.snapshot(dimension));
            report += Self::deliver_pending(state, snapshot, transport);
        }
        report
    }

    /// Catch-up for a single observer, used right after it joins.
    pub fn synchronize_observer(
        &mut self,
        observer: &ObserverId,
        registry: &DimensionRegistry,
        transport: &dyn DeltaTransport,
    ) -> SyncReport {
        let Some(state) = self.observers.get_mut(observer) else {
            return SyncReport::default();
        };
        let snapshot = registry.snapshot(state.dimension());
        Self::deliver_pending(state, &snapshot, transport)
    }

    fn deliver_pending(state: &mut ObserverState, snapshot: &CacheSnapshot, transport: &dyn DeltaTransport) -> SyncReport {
        let mut report = SyncReport::default();
        let dimension = state.dimension().clone();
        for (owner, members) in snapshot {
            if state.holds_current(&dimension, owner, members) {
                continue;
            }
            match transport.send_add(&state.id, &dimension, owner, members) {
                Ok(()) => {
                    if state.mark_delivered(&dimension, *owner, members.clone()) {
                        trace!("[Sync] add {} -> {} ({} members)", owner, state.id, members.len());
                    } else {
                        trace!("[Sync] refresh {} -> {} ({} members)", owner, state.id, members.len());
                    }
                    metrics::record_add_delta(&dimension);
                    report.adds_sent += 1;
                }
                Err(e) => {
                    // Not marked delivered, so the next tick retries it.
                    log_send_error(&e, &state.id, "add_bounding_box");
                    metrics::record_transport_failure("add");
                    report.add_failures += 1;
                }
            }
        }
        if report.adds_sent > 0 {
            debug!("[Sync] Sent {} adds to {} in {}", report.adds_sent, state.id, dimension);
        }
        report
    }

    /// Tells every observer holding `owner` for `dimension` that it is gone,
    /// evicting it from their delivered-sets. Observers that never received
    /// it get nothing. Eviction happens whether or not the hand-off works.
    pub fn broadcast_removal(
        &mut self,
        dimension: &DimensionId,
        owner: &BoundingBox,
        transport: &dyn DeltaTransport,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        for state in self.observers.values_mut() {
            if !state.evict(dimension, owner) {
                continue;
            }
            match transport.send_remove(&state.id, dimension, owner) {
                Ok(()) => {
                    trace!("[Sync] remove {} -> {}", owner, state.id);
                    metrics::record_remove_delta(dimension);
                    report.removes_sent += 1;
                }
                Err(e) => {
                    log_send_error(&e, &state.id, "remove_bounding_box");
                    metrics::record_transport_failure("remove");
                    report.remove_failures += 1;
                }
            }
        }
        report
    }
}
