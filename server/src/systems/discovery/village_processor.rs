// bbox_sync/server/src/systems/discovery/village_processor.rs
use crate::concurrent::bounding_box_cache::BoundingBoxCache;
use crate::core::config::VillageConfig;
use crate::core::constants::{IRON_GOLEM_SPAWN_XZ, IRON_GOLEM_SPAWN_Y};
use crate::core::error::{SyncError, SyncResult};
use crate::core::types::{BoundingBox, BoxKind, BoxMetadata, DimensionId};
use crate::operational::monitoring::metrics;
use crate::world::village::LiveVillage;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, warn};

use super::village_colors::VillageColorCache;
use super::DiscoveryOutcome;

/// Re-derives village boxes from live engine state on each tick and diffs them
/// against the boxes it produced last time.
pub struct VillageProcessor {
    dimension: DimensionId,
    cache: Arc<BoundingBoxCache>,
    colors: Arc<VillageColorCache>,
    config: VillageConfig,
    known: AHashMap<i32, BoundingBox>,
}

impl VillageProcessor {
    pub fn new(
        dimension: DimensionId,
        cache: Arc<BoundingBoxCache>,
        colors: Arc<VillageColorCache>,
        config: VillageConfig,
    ) -> Self {
        VillageProcessor {
            dimension,
            cache,
            colors,
            config,
            known: AHashMap::new(),
        }
    }

    pub fn process(&mut self, villages: &[LiveVillage]) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();
        let mut previous = std::mem::take(&mut self.known);
        let mut current: AHashMap<i32, BoundingBox> = AHashMap::with_capacity(villages.len());

        for village in villages {
            if current.contains_key(&village.id) {
                warn!("[Village {}] Duplicate village id {} in one tick, ignoring repeat", self.dimension, village.id);
                metrics::record_malformed_unit(&self.dimension);
                outcome.skipped += 1;
                continue;
            }

            let (owner, members) = match self.village_entry(village) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("[Village {}] Skipping village {}: {}", self.dimension, village.id, e);
                    metrics::record_malformed_unit(&self.dimension);
                    outcome.skipped += 1;
                    // Leave whatever we had for this village untouched.
                    if let Some(old) = previous.remove(&village.id) {
                        current.insert(village.id, old);
                    }
                    continue;
                }
            };

            if let Some(old) = previous.remove(&village.id) {
                if old != owner {
                    debug!("[Village {}] Village {} changed shape", self.dimension, village.id);
                    self.cache.remove_bounding_box(&old);
                    outcome.removed.push(old);
                }
            }
            if self.cache.add_bounding_boxes(owner, members) {
                outcome.upserted += 1;
            }
            current.insert(village.id, owner);
        }

        for (village_id, old) in previous {
            debug!("[Village {}] Village {} is gone", self.dimension, village_id);
            self.cache.remove_bounding_box(&old);
            outcome.removed.push(old);
        }

        self.known = current;
        outcome
    }

    pub fn tracked(&self) -> usize {
        self.known.len()
    }

    pub fn clear(&mut self) {
        self.known.clear();
    }

    fn village_entry(&self, village: &LiveVillage) -> SyncResult<(BoundingBox, SmallVec<[BoundingBox; 16]>)> {
        if village.radius < 0 {
            return Err(SyncError::MalformedInput(format!("negative radius {}", village.radius)));
        }
        let spawns_iron_golems = village.door_count() >= self.config.iron_golem_min_doors
            && village.villagers >= self.config.iron_golem_min_villagers;

        let r = village.radius;
        let center = village.center;
        let owner = BoundingBox::try_new(BoxKind::Village, center.offset(-r, -r, -r)?, center.offset(r, r, r)?)?
            .with_metadata(BoxMetadata::Village {
                center,
                radius: r,
                color: self.colors.color_for(village.id),
                spawns_iron_golems,
                layout: layout_hash(village),
            });

        let mut members: SmallVec<[BoundingBox; 16]> = SmallVec::new();
        for door in &village.doors {
            members.push(BoundingBox::from_corners(BoxKind::VillageDoor, *door, *door));
        }
        if spawns_iron_golems {
            members.push(BoundingBox::try_new(
                BoxKind::IronGolemSpawn,
                center.offset(-IRON_GOLEM_SPAWN_XZ, -IRON_GOLEM_SPAWN_Y, -IRON_GOLEM_SPAWN_XZ)?,
                center.offset(IRON_GOLEM_SPAWN_XZ - 1, IRON_GOLEM_SPAWN_Y - 1, IRON_GOLEM_SPAWN_XZ - 1)?,
            )?);
        }
        for (min, max) in &village.lots {
            members.push(BoundingBox::try_new(BoxKind::VillageLot, *min, *max)?);
        }
        Ok((owner, members))
    }
}

/// Order-independent fingerprint of a village's doors and lots. Folded into
/// the owner box so a layout change is seen as a different village box.
fn layout_hash(village: &LiveVillage) -> u64 {
    let mut doors = village.doors.clone();
    doors.sort_unstable();
    let mut lots = village.lots.clone();
    lots.sort_unstable();

    let mut bytes = Vec::with_capacity((doors.len() + lots.len() * 2) * 12 + 8);
    // Door count first so a door and a lot corner at the same spot differ.
    bytes.extend_from_slice(&(doors.len() as u64).to_le_bytes());
    for pos in doors.iter().chain(lots.iter().flat_map(|(min, max)| [min, max])) {
        bytes.extend_from_slice(&pos.x.to_le_bytes());
        bytes.extend_from_slice(&pos.y.to_le_bytes());
        bytes.extend_from_slice(&pos.z.to_le_bytes());
    }
    seahash::hash(&bytes)
}
