// bbox_sync/server/src/client/replica.rs
use crate::concurrent::bounding_box_cache::CacheSnapshot;
use crate::core::config::SyncConfig;
use crate::core::types::{DimensionId, WorldData};
use crate::network::messages::ClientMessage;
use crate::world::registry::DimensionRegistry;

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info};

/// What a renderer gets for one dimension.
#[derive(Debug, Clone)]
pub struct RenderView {
    pub outer_boxes_only: bool,
    pub entries: CacheSnapshot,
}

/// Receiving end of the delta stream. Mirrors whatever it is sent into its
/// own per-dimension caches.
pub struct BoundingBoxReplica {
    registry: DimensionRegistry,
    world_data: ArcSwapOption<WorldData>,
    keep_cache_between_sessions: bool,
    outer_boxes_only: AtomicBool,
}

impl BoundingBoxReplica {
    pub fn new(config: &SyncConfig) -> Self {
        BoundingBoxReplica {
            registry: DimensionRegistry::without_processors(),
            world_data: ArcSwapOption::const_empty(),
            keep_cache_between_sessions: config.keep_cache_between_sessions,
            outer_boxes_only: AtomicBool::new(config.outer_boxes_only),
        }
    }

    /// Returns whether the message changed local state.
    pub fn apply(&self, message: ClientMessage) -> bool {
        match message {
            ClientMessage::Initialize(world) => {
                info!("[Replica] Initialized (seed: {}, spawn: {}, {})", world.seed, world.spawn_x, world.spawn_z);
                self.world_data.store(Some(Arc::new(world)));
                true
            }
            ClientMessage::AddBoundingBox { dimension, owner, members } => {
                let state = self.registry.get_or_create(&dimension);
                state.cache.add_bounding_boxes(owner, members)
            }
            ClientMessage::RemoveBoundingBox { dimension, owner } => match self.registry.cache(&dimension) {
                Some(cache) => cache.remove_bounding_box(&owner),
                None => {
                    debug!("[Replica] Remove for {} in unknown dimension {}", owner, dimension);
                    false
                }
            },
        }
    }

    pub fn disconnected(&self) {
        if self.keep_cache_between_sessions {
            debug!("[Replica] Keeping {} dimension caches across sessions", self.registry.len());
            return;
        }
        self.registry.clear_all();
        self.world_data.store(None);
    }

    pub fn render_view(&self, dimension: &DimensionId) -> RenderView {
        RenderView {
            outer_boxes_only: self.outer_boxes_only(),
            entries: self.registry.snapshot(dimension),
        }
    }

    pub fn outer_boxes_only(&self) -> bool {
        self.outer_boxes_only.load(AtomicOrdering::Relaxed)
    }

    /// Returns the new value.
    pub fn toggle_outer_boxes_only(&self) -> bool {
        !self.outer_boxes_only.fetch_xor(true, AtomicOrdering::Relaxed)
    }

    pub fn world_data(&self) -> Option<WorldData> {
        self.world_data.load_full().map(|world| *world)
    }

    pub fn dimensions(&self) -> Vec<DimensionId> {
        self.registry.dimensions()
    }
}
