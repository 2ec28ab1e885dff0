// bbox_sync/server/src/systems/discovery/world_spawn.rs
use crate::concurrent::bounding_box_cache::BoundingBoxCache;
use crate::core::constants::{CHUNK_SIZE, LAZY_SPAWN_CHUNK_RADIUS, SPAWN_CHUNK_RADIUS, WORLD_MAX_Y, WORLD_MIN_Y, WORLD_SPAWN_RADIUS};
use crate::core::error::{SyncError, SyncResult};
use crate::core::types::{BoundingBox, BoxKind, Coords, DimensionId, WorldData};
use crate::operational::monitoring::metrics;
use std::sync::Arc;
use tracing::{debug, warn};

use super::DiscoveryOutcome;

/// Tracks the world spawn and the always-loaded chunk areas around it.
pub struct WorldSpawnProcessor {
    dimension: DimensionId,
    cache: Arc<BoundingBoxCache>,
    current: Option<BoundingBox>,
}

impl WorldSpawnProcessor {
    pub fn new(dimension: DimensionId, cache: Arc<BoundingBoxCache>) -> Self {
        WorldSpawnProcessor { dimension, cache, current: None }
    }

    /// A spawn too close to the coordinate limits is skipped and the previous
    /// spawn entry, if any, stays in place.
    pub fn process(&mut self, world: &WorldData) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();
        let entry = spawn_bounds(world).and_then(|owner| {
            let members = [
                chunk_area(BoxKind::SpawnChunks, world, SPAWN_CHUNK_RADIUS)?,
                chunk_area(BoxKind::LazySpawnChunks, world, LAZY_SPAWN_CHUNK_RADIUS)?,
            ];
            Ok((owner, members))
        });
        let (owner, members) = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("[WorldSpawn] Skipping spawn ({}, {}) in {}: {}", world.spawn_x, world.spawn_z, self.dimension, e);
                metrics::record_malformed_unit(&self.dimension);
                outcome.skipped += 1;
                return outcome;
            }
        };

        if let Some(old) = self.current.take() {
            if old != owner {
                debug!("[WorldSpawn] Spawn moved from {} to {}", old, owner);
                self.cache.remove_bounding_box(&old);
                outcome.removed.push(old);
            }
        }

        if self.cache.add_bounding_boxes(owner, members) {
            outcome.upserted += 1;
        }
        self.current = Some(owner);
        outcome
    }

    pub fn current(&self) -> Option<BoundingBox> {
        self.current
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

pub fn spawn_bounds(world: &WorldData) -> SyncResult<BoundingBox> {
    let spawn = Coords::new(world.spawn_x, WORLD_MIN_Y, world.spawn_z);
    BoundingBox::try_new(
        BoxKind::WorldSpawn,
        spawn.offset(-WORLD_SPAWN_RADIUS, 0, -WORLD_SPAWN_RADIUS)?,
        spawn.offset(WORLD_SPAWN_RADIUS, WORLD_MAX_Y - WORLD_MIN_Y, WORLD_SPAWN_RADIUS)?,
    )
}

/// Block extent of the square of chunks within `radius` of the spawn chunk.
fn chunk_area(kind: BoxKind, world: &WorldData, radius: i32) -> SyncResult<BoundingBox> {
    let spawn = Coords::new(world.spawn_x, WORLD_MIN_Y, world.spawn_z);
    let chunk_edge = |chunk: i32, delta: i32| -> SyncResult<i32> {
        chunk
            .checked_add(delta)
            .and_then(|edge| edge.checked_mul(CHUNK_SIZE))
            .ok_or_else(|| SyncError::MalformedInput(format!("spawn chunk {} + {} leaves the world", chunk, delta)))
    };
    BoundingBox::try_new(
        kind,
        Coords::new(chunk_edge(spawn.chunk_x(), -radius)?, WORLD_MIN_Y, chunk_edge(spawn.chunk_z(), -radius)?),
        Coords::new(
            chunk_edge(spawn.chunk_x(), radius + 1)? - 1,
            WORLD_MAX_Y,
            chunk_edge(spawn.chunk_z(), radius + 1)? - 1,
        ),
    )
}
