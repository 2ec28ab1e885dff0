// bbox_sync/server/src/systems/discovery/chunk_processor.rs
use crate::concurrent::bounding_box_cache::BoundingBoxCache;
use crate::core::constants::{SPAWNER_RANGE_XZ, SPAWNER_RANGE_Y};
use crate::core::error::SyncResult;
use crate::core::types::{BoundingBox, BoxKind, Coords, DimensionId, MemberSet, StructureKind};
use crate::operational::monitoring::metrics;
use crate::world::chunk::{ChunkSnapshot, StructureStart};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::DiscoveryOutcome;

/// Spawn volume of the mob spawner at `pos`. Chunk scans and the
/// spawner-broken trigger both derive the key from here.
pub fn spawner_bounds(pos: Coords) -> SyncResult<BoundingBox> {
    BoundingBox::try_new(
        BoxKind::MobSpawner,
        pos.offset(-SPAWNER_RANGE_XZ, -SPAWNER_RANGE_Y, -SPAWNER_RANGE_XZ)?,
        pos.offset(SPAWNER_RANGE_XZ, SPAWNER_RANGE_Y, SPAWNER_RANGE_XZ)?,
    )
}

/// Scans loaded chunks for the structure kinds of one dimension.
pub struct ChunkProcessor {
    dimension: DimensionId,
    recognized: &'static [StructureKind],
    cache: Arc<BoundingBoxCache>,
}

impl ChunkProcessor {
    pub fn new(dimension: DimensionId, cache: Arc<BoundingBoxCache>) -> Self {
        let recognized = StructureKind::for_dimension(dimension.kind());
        ChunkProcessor { dimension, recognized, cache }
    }

    pub fn recognized(&self) -> &'static [StructureKind] {
        self.recognized
    }

    pub fn process(&self, chunk: &ChunkSnapshot) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();
        if chunk.is_empty() {
            return outcome;
        }

        for start in &chunk.structure_starts {
            let Some(kind) = StructureKind::from_engine_id(&start.id) else {
                trace!("[Chunk {},{}] Ignoring unknown structure '{}'", chunk.chunk_x, chunk.chunk_z, start.id);
                continue;
            };
            if !self.recognized.contains(&kind) {
                continue;
            }
            match Self::structure_entry(kind, start) {
                Ok((owner, members)) => {
                    if self.cache.add_bounding_boxes(owner, members) {
                        outcome.upserted += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        "[Chunk {},{}] Skipping {:?} in {}: {}",
                        chunk.chunk_x, chunk.chunk_z, kind, self.dimension, e
                    );
                    metrics::record_malformed_unit(&self.dimension);
                    outcome.skipped += 1;
                }
            }
        }

        for pos in &chunk.spawners {
            match spawner_bounds(*pos) {
                Ok(bounds) => {
                    if self.cache.add_bounding_box(bounds) {
                        outcome.upserted += 1;
                    }
                }
                Err(e) => {
                    warn!("[Chunk {},{}] Skipping spawner in {}: {}", chunk.chunk_x, chunk.chunk_z, self.dimension, e);
                    metrics::record_malformed_unit(&self.dimension);
                    outcome.skipped += 1;
                }
            }
        }

        if !outcome.is_noop() {
            debug!(
                "[Chunk {},{}] {} entries upserted in {}",
                chunk.chunk_x, chunk.chunk_z, outcome.upserted, self.dimension
            );
        }
        outcome
    }

    /// The structure's outer box owns its pieces. Any malformed piece rejects
    /// the whole structure so the cache never holds a partial member set.
    fn structure_entry(kind: StructureKind, start: &StructureStart) -> SyncResult<(BoundingBox, MemberSet)> {
        let box_kind = BoxKind::Structure(kind);
        let owner = BoundingBox::try_new(box_kind, start.min, start.max)?;
        let members = start
            .pieces
            .iter()
            .map(|piece| BoundingBox::try_new(box_kind, piece.min, piece.max))
            .collect::<SyncResult<MemberSet>>()?;
        Ok((owner, members))
    }
}
