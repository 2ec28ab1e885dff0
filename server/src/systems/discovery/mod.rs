// bbox_sync/server/src/systems/discovery/mod.rs
//! Processors that turn engine data into cache entries.
//!
//! Every dimension gets one [`DimensionProcessors`] bundle, resolved from the
//! dimension kind when the dimension is first referenced.

pub mod chunk_processor;
pub mod village_colors;
pub mod village_processor;
pub mod world_spawn;

use crate::concurrent::bounding_box_cache::BoundingBoxCache;
use crate::core::config::VillageConfig;
use crate::core::types::{BoundingBox, DimensionId, DimensionKind};
use std::sync::Arc;

use chunk_processor::ChunkProcessor;
use village_colors::VillageColorCache;
use village_processor::VillageProcessor;
use world_spawn::WorldSpawnProcessor;

/// What one processing pass did to its cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// Owners inserted or whose member set changed.
    pub upserted: usize,
    /// Owners dropped from the cache; observers holding them must be told.
    pub removed: Vec<BoundingBox>,
    /// Units skipped as malformed.
    pub skipped: usize,
}

impl DiscoveryOutcome {
    pub fn is_noop(&self) -> bool {
        self.upserted == 0 && self.removed.is_empty()
    }
}

pub struct DimensionProcessors {
    pub chunk: ChunkProcessor,
    pub village: VillageProcessor,
    /// Only the overworld tracks the world spawn.
    pub world_spawn: Option<WorldSpawnProcessor>,
}

impl DimensionProcessors {
    pub fn for_dimension(
        dimension: &DimensionId,
        cache: Arc<BoundingBoxCache>,
        colors: Arc<VillageColorCache>,
        village_config: VillageConfig,
    ) -> Self {
        let world_spawn = match dimension.kind() {
            DimensionKind::Overworld => Some(WorldSpawnProcessor::new(dimension.clone(), cache.clone())),
            _ => None,
        };
        DimensionProcessors {
            chunk: ChunkProcessor::new(dimension.clone(), cache.clone()),
            village: VillageProcessor::new(dimension.clone(), cache, colors, village_config),
            world_spawn,
        }
    }

    /// Drops remembered state. Cache contents are left to the caller.
    pub fn clear(&mut self) {
        self.village.clear();
        if let Some(world_spawn) = self.world_spawn.as_mut() {
            world_spawn.clear();
        }
    }
}
