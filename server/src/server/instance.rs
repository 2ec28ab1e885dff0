// bbox_sync/server/src/server/instance.rs
use crate::concurrent::bounding_box_cache::CacheSnapshot;
use crate::concurrent::event_queue::EventQueue;
use crate::core::config::SyncConfig;
use crate::core::types::{BoundingBox, Coords, DimensionId, DimensionKind, ObserverId, WorldData, WorldEvent};
use crate::entities::observer::ObserverIdPool;
use crate::network::transport::{log_send_error, DeltaTransport};
use crate::operational::monitoring::metrics;
use crate::systems::discovery::chunk_processor::spawner_bounds;
use crate::systems::discovery::DiscoveryOutcome;
use crate::world::chunk::ChunkSnapshot;
use crate::world::registry::DimensionRegistry;
use crate::world::village::LiveVillage;

use super::sync_controller::{ObserverSyncController, SyncReport};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Server-side coordinator: routes engine events to discovery, keeps every
/// observer in step with the per-dimension caches.
pub struct BoundingBoxServer {
    pub config: Arc<SyncConfig>,
    pub registry: Arc<DimensionRegistry>,
    pub events: EventQueue,
    pub observer_ids: ObserverIdPool,
    pub frame_counter: AtomicU64,

    controller: Mutex<ObserverSyncController>,
    transport: Arc<dyn DeltaTransport>,
    world_data: ArcSwapOption<WorldData>,
}

impl BoundingBoxServer {
    pub fn new(config: Arc<SyncConfig>, transport: Arc<dyn DeltaTransport>) -> Self {
        info!("Initializing BoundingBoxServer (tick rate {} Hz)...", config.tick_rate);
        BoundingBoxServer {
            registry: Arc::new(DimensionRegistry::new(config.village.clone())),
            config,
            events: EventQueue::new(),
            observer_ids: ObserverIdPool::new(),
            frame_counter: AtomicU64::new(0),
            controller: Mutex::new(ObserverSyncController::new()),
            transport,
            world_data: ArcSwapOption::const_empty(),
        }
    }

    pub fn observer_id(&self, name: &str) -> ObserverId {
        self.observer_ids.get_or_create(name)
    }

    /// Enqueues an engine event; safe from any thread.
    pub fn publish(&self, event: WorldEvent) {
        self.events.push(event);
    }

    /// Drains at most one batch of queued events, in push order.
    pub fn process_pending_events(&self) -> usize {
        let batch = self.events.pop_batch(self.config.event_batch_size);
        let count = batch.len();
        for event in batch {
            self.handle_event(event);
        }
        if count > 0 && !self.events.is_empty() {
            debug!("[Events] {} events left for the next tick", self.events.len());
        }
        count
    }

    pub fn handle_event(&self, event: WorldEvent) {
        match event {
            WorldEvent::WorldLoaded { dimension, seed, spawn_x, spawn_z } => {
                self.world_loaded(&dimension, seed, spawn_x, spawn_z)
            }
            WorldEvent::ChunkLoaded { dimension, chunk } => {
                self.chunk_loaded(&dimension, &chunk);
            }
            WorldEvent::VillageTick { dimension, villages } => {
                self.village_tick(&dimension, &villages);
            }
            WorldEvent::ServerTick => {
                self.synchronize_observers();
            }
            WorldEvent::ObserverJoined { observer, dimension } => {
                self.observer_joined(observer, dimension);
            }
            WorldEvent::ObserverLeft { observer } => self.observer_left(&observer),
            WorldEvent::ObserverChangedDimension { observer, dimension } => {
                self.observer_changed_dimension(&observer, dimension)
            }
            WorldEvent::SpawnerBroken { dimension, pos } => {
                self.spawner_broken(&dimension, pos);
            }
        }
    }

    pub fn world_loaded(&self, dimension: &DimensionId, seed: i64, spawn_x: i32, spawn_z: i32) {
        let state = self.registry.get_or_create(dimension);
        metrics::update_dimension_count(self.registry.len());
        info!("[World] Loaded dimension {} (seed: {})", dimension, seed);

        if dimension.kind() != DimensionKind::Overworld {
            return;
        }
        let world = WorldData::new(seed, spawn_x, spawn_z);
        self.world_data.store(Some(Arc::new(world)));

        let outcome = match state.processors.as_ref() {
            Some(processors) => processors.lock().world_spawn.as_mut().map(|spawn| spawn.process(&world)),
            None => None,
        };
        if let Some(outcome) = outcome {
            self.broadcast_removals(dimension, &outcome);
        }
    }

    pub fn chunk_loaded(&self, dimension: &DimensionId, chunk: &ChunkSnapshot) -> DiscoveryOutcome {
        let state = self.registry.get_or_create(dimension);
        match state.processors.as_ref() {
            Some(processors) => processors.lock().chunk.process(chunk),
            None => DiscoveryOutcome::default(),
        }
    }

    pub fn village_tick(&self, dimension: &DimensionId, villages: &[LiveVillage]) -> DiscoveryOutcome {
        let state = self.registry.get_or_create(dimension);
        let outcome = match state.processors.as_ref() {
            Some(processors) => processors.lock().village.process(villages),
            None => DiscoveryOutcome::default(),
        };
        self.broadcast_removals(dimension, &outcome);
        outcome
    }

    /// Subscribes the observer and catches it up immediately.
    pub fn observer_joined(&self, observer: ObserverId, dimension: DimensionId) -> SyncReport {
        if let Some(world) = self.world_data() {
            if let Err(e) = self.transport.send_initialize(&observer, &world) {
                log_send_error(&e, &observer, "initialize");
                metrics::record_transport_failure("initialize");
            }
        }
        let mut controller = self.controller.lock();
        controller.subscribe(observer.clone(), dimension);
        controller.synchronize_observer(&observer, &self.registry, self.transport.as_ref())
    }

    pub fn observer_left(&self, observer: &ObserverId) {
        if !self.controller.lock().unsubscribe(observer) {
            debug!("[Sync] Ignoring leave of unknown observer {}", observer);
        }
        self.observer_ids.remove(observer);
    }

    pub fn observer_changed_dimension(&self, observer: &ObserverId, dimension: DimensionId) {
        if !self.controller.lock().change_dimension(observer, dimension) {
            warn!("[Sync] Dimension change for unsubscribed observer {}", observer);
        }
    }

    pub fn spawner_broken(&self, dimension: &DimensionId, pos: Coords) -> SyncReport {
        match spawner_bounds(pos) {
            Ok(owner) => self.remove_bounding_box(dimension, &owner),
            Err(e) => {
                warn!("[World] Ignoring broken spawner in {}: {}", dimension, e);
                metrics::record_malformed_unit(dimension);
                SyncReport::default()
            }
        }
    }

    /// Drops `owner` from the dimension cache (if any) and tells every
    /// observer holding it.
    pub fn remove_bounding_box(&self, dimension: &DimensionId, owner: &BoundingBox) -> SyncReport {
        if let Some(cache) = self.registry.cache(dimension) {
            cache.remove_bounding_box(owner);
        }
        self.controller.lock().broadcast_removal(dimension, owner, self.transport.as_ref())
    }

    fn broadcast_removals(&self, dimension: &DimensionId, outcome: &DiscoveryOutcome) -> SyncReport {
        let mut report = SyncReport::default();
        if outcome.removed.is_empty() {
            return report;
        }
        let mut controller = self.controller.lock();
        for owner in &outcome.removed {
            report += controller.broadcast_removal(dimension, owner, self.transport.as_ref());
        }
        report
    }

    pub fn synchronize_observers(&self) -> SyncReport {
        self.controller.lock().synchronize(&self.registry, self.transport.as_ref())
    }

    /// Full disconnect reset. Caches survive only when configured to.
    pub fn reset(&self) {
        self.controller.lock().clear();
        if self.config.keep_cache_between_sessions {
            info!("[World] Reset keeps {} dimension caches", self.registry.len());
            return;
        }
        self.registry.clear_all();
        self.world_data.store(None);
        metrics::update_dimension_count(0);
    }

    pub fn world_data(&self) -> Option<WorldData> {
        self.world_data.load_full().map(|world| *world)
    }

    pub fn cache_snapshot(&self, dimension: &DimensionId) -> CacheSnapshot {
        self.registry.snapshot(dimension)
    }

    pub fn observer_count(&self) -> usize {
        self.controller.lock().observer_count()
    }

    pub fn is_subscribed(&self, observer: &ObserverId) -> bool {
        self.controller.lock().is_subscribed(observer)
    }

    pub fn delivered_count(&self, observer: &ObserverId, dimension: &DimensionId) -> usize {
        self.controller
            .lock()
            .delivered(observer, dimension)
            .map_or(0, |set| set.len())
    }

    pub fn has_delivered(&self, observer: &ObserverId, dimension: &DimensionId, owner: &BoundingBox) -> bool {
        self.controller
            .lock()
            .observer(observer)
            .map_or(false, |state| state.has_delivered(dimension, owner))
    }

    pub fn frame(&self) -> u64 {
        self.frame_counter.load(AtomicOrdering::Relaxed)
    }
}
