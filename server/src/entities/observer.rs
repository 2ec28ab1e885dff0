// bbox_sync/server/src/entities/observer.rs
use crate::core::types::{BoundingBox, DimensionId, MemberSet, ObserverId};
use ahash::AHashMap;
use dashmap::DashMap;
use std::sync::Arc;

// Observer ID Pool
pub struct ObserverIdPool {
    allocated_ids: Arc<DashMap<String, ObserverId>>,
}

impl ObserverIdPool {
    pub fn new() -> Self {
        ObserverIdPool {
            allocated_ids: Arc::new(DashMap::new()),
        }
    }

    pub fn get_or_create(&self, id_str: &str) -> ObserverId {
        if let Some(existing_arc) = self.allocated_ids.get(id_str) {
            return existing_arc.value().clone();
        }
        self.allocated_ids
            .entry(id_str.to_string())
            .or_insert_with(|| Arc::new(id_str.to_string()))
            .value()
            .clone()
    }

    pub fn remove(&self, id_str: &str) -> Option<ObserverId> {
        self.allocated_ids.remove(id_str).map(|(_key, arc_id)| arc_id)
    }
}

impl Default for ObserverIdPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Owners handed to one observer in one dimension, with the member set each
/// was sent with.
pub type DeliveredSet = AHashMap<BoundingBox, Arc<MemberSet>>;

/// A subscribed observer: where it is now, and which owners it already
/// holds, tracked separately for each dimension it has been synced in.
#[derive(Debug, Clone)]
pub struct ObserverState {
    pub id: ObserverId,
    dimension: DimensionId,
    delivered: AHashMap<DimensionId, DeliveredSet>,
}

impl ObserverState {
    pub fn new(id: ObserverId, dimension: DimensionId) -> Self {
        ObserverState { id, dimension, delivered: AHashMap::new() }
    }

    pub fn dimension(&self) -> &DimensionId {
        &self.dimension
    }

    pub fn set_dimension(&mut self, dimension: DimensionId) {
        self.dimension = dimension;
    }

    pub fn delivered_in(&self, dimension: &DimensionId) -> Option<&DeliveredSet> {
        self.delivered.get(dimension)
    }

    pub fn has_delivered(&self, dimension: &DimensionId, owner: &BoundingBox) -> bool {
        self.delivered.get(dimension).map_or(false, |set| set.contains_key(owner))
    }

    /// True when `owner` was delivered with exactly `members`. The cache only
    /// swaps the `Arc` when the set really changes, so pointer equality is
    /// enough.
    pub fn holds_current(&self, dimension: &DimensionId, owner: &BoundingBox, members: &Arc<MemberSet>) -> bool {
        self.delivered
            .get(dimension)
            .and_then(|set| set.get(owner))
            .map_or(false, |sent| Arc::ptr_eq(sent, members))
    }

    /// Returns false when the owner was already held (its member set is
    /// refreshed).
    pub fn mark_delivered(&mut self, dimension: &DimensionId, owner: BoundingBox, members: Arc<MemberSet>) -> bool {
        if let Some(set) = self.delivered.get_mut(dimension) {
            return set.insert(owner, members).is_none();
        }
        self.delivered.entry(dimension.clone()).or_default().insert(owner, members).is_none()
    }

    pub fn evict(&mut self, dimension: &DimensionId, owner: &BoundingBox) -> bool {
        self.delivered.get_mut(dimension).map_or(false, |set| set.remove(owner).is_some())
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.values().map(|set| set.len()).sum()
    }
}
