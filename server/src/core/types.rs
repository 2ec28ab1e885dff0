// bbox_sync/server/src/core/types.rs
use ahash::AHashSet;
use std::fmt;
use std::sync::Arc;

use super::error::{SyncError, SyncResult};
use crate::world::chunk::ChunkSnapshot;
use crate::world::village::LiveVillage;

pub type ObserverId = Arc<String>;

/// Member boxes grouped under one owner-region.
pub type MemberSet = AHashSet<BoundingBox>;

// --- Dimensions ---

/// Opaque key of an independent world partition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimensionId(Arc<str>);

impl DimensionId {
    pub const OVERWORLD: &'static str = "overworld";
    pub const NETHER: &'static str = "the_nether";
    pub const END: &'static str = "the_end";

    pub fn new(name: impl Into<Arc<str>>) -> Self {
        DimensionId(name.into())
    }

    pub fn overworld() -> Self { Self::new(Self::OVERWORLD) }
    pub fn nether() -> Self { Self::new(Self::NETHER) }
    pub fn end() -> Self { Self::new(Self::END) }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> DimensionKind {
        match self.as_str() {
            Self::OVERWORLD => DimensionKind::Overworld,
            Self::NETHER => DimensionKind::Nether,
            Self::END => DimensionKind::End,
            _ => DimensionKind::Other,
        }
    }
}

impl From<&str> for DimensionId {
    fn from(name: &str) -> Self {
        DimensionId::new(name)
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Overworld,
    Nether,
    End,
    Other,
}

// --- Basic Geometric Types ---
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coords {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coords {
    pub const fn new(x: i32, y: i32, z: i32) -> Self { Coords { x, y, z } }

    /// Shifted copy. Fails instead of wrapping when an axis leaves `i32`.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> SyncResult<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy), self.z.checked_add(dz)) {
            (Some(x), Some(y), Some(z)) => Ok(Coords { x, y, z }),
            _ => Err(SyncError::MalformedInput(format!(
                "{} offset by ({}, {}, {}) overflows",
                self, dx, dy, dz
            ))),
        }
    }

    pub const fn chunk_x(&self) -> i32 { self.x >> 4 }
    pub const fn chunk_z(&self) -> i32 { self.z >> 4 }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self { Color { r, g, b } }
}

// --- Box classification ---
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    DesertTemple,
    JungleTemple,
    WitchHut,
    OceanMonument,
    Stronghold,
    Mineshaft,
    Igloo,
    OceanRuin,
    Shipwreck,
    BuriedTreasure,
    Mansion,
    PillagerOutpost,
    NetherFortress,
    EndCity,
}

impl StructureKind {
    pub const OVERWORLD: &'static [StructureKind] = &[
        StructureKind::DesertTemple,
        StructureKind::JungleTemple,
        StructureKind::WitchHut,
        StructureKind::OceanMonument,
        StructureKind::Stronghold,
        StructureKind::Mineshaft,
        StructureKind::Igloo,
        StructureKind::OceanRuin,
        StructureKind::Shipwreck,
        StructureKind::BuriedTreasure,
        StructureKind::Mansion,
        StructureKind::PillagerOutpost,
    ];
    pub const NETHER: &'static [StructureKind] = &[StructureKind::NetherFortress];
    pub const END: &'static [StructureKind] = &[StructureKind::EndCity];

    /// Structure kinds scanned for in chunks of the given dimension kind.
    pub fn for_dimension(kind: DimensionKind) -> &'static [StructureKind] {
        match kind {
            DimensionKind::Overworld => Self::OVERWORLD,
            DimensionKind::Nether => Self::NETHER,
            DimensionKind::End => Self::END,
            DimensionKind::Other => &[],
        }
    }

    /// Engine identifier of the structure start.
    pub fn engine_id(&self) -> &'static str {
        match self {
            StructureKind::DesertTemple => "Desert_Pyramid",
            StructureKind::JungleTemple => "Jungle_Pyramid",
            StructureKind::WitchHut => "Swamp_Hut",
            StructureKind::OceanMonument => "Monument",
            StructureKind::Stronghold => "Stronghold",
            StructureKind::Mineshaft => "Mineshaft",
            StructureKind::Igloo => "Igloo",
            StructureKind::OceanRuin => "Ocean_Ruin",
            StructureKind::Shipwreck => "Shipwreck",
            StructureKind::BuriedTreasure => "Buried_Treasure",
            StructureKind::Mansion => "Mansion",
            StructureKind::PillagerOutpost => "Pillager_Outpost",
            StructureKind::NetherFortress => "Fortress",
            StructureKind::EndCity => "EndCity",
        }
    }

    pub fn from_engine_id(id: &str) -> Option<Self> {
        const ALL: &[StructureKind] = &[
            StructureKind::DesertTemple,
            StructureKind::JungleTemple,
            StructureKind::WitchHut,
            StructureKind::OceanMonument,
            StructureKind::Stronghold,
            StructureKind::Mineshaft,
            StructureKind::Igloo,
            StructureKind::OceanRuin,
            StructureKind::Shipwreck,
            StructureKind::BuriedTreasure,
            StructureKind::Mansion,
            StructureKind::PillagerOutpost,
            StructureKind::NetherFortress,
            StructureKind::EndCity,
        ];
        ALL.iter().copied().find(|kind| kind.engine_id().eq_ignore_ascii_case(id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxKind {
    Structure(StructureKind),
    MobSpawner,
    Village,
    VillageDoor,
    VillageLot,
    IronGolemSpawn,
    WorldSpawn,
    SpawnChunks,
    LazySpawnChunks,
}

impl BoxKind {
    fn tag(&self) -> u8 {
        match self {
            BoxKind::Structure(kind) => 32 + *kind as u8,
            BoxKind::MobSpawner => 1,
            BoxKind::Village => 2,
            BoxKind::VillageDoor => 3,
            BoxKind::VillageLot => 4,
            BoxKind::IronGolemSpawn => 5,
            BoxKind::WorldSpawn => 6,
            BoxKind::SpawnChunks => 7,
            BoxKind::LazySpawnChunks => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxMetadata {
    None,
    Village {
        center: Coords,
        radius: i32,
        color: Color,
        spawns_iron_golems: bool,
        /// Seahash over the village's sorted doors and lots.
        layout: u64,
    },
}

// --- BoundingBox ---

/// Immutable region descriptor. Equality and hashing cover kind, extent and
/// metadata, so a box recomputed from the same source data compares equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    kind: BoxKind,
    min: Coords,
    max: Coords,
    metadata: BoxMetadata,
}

impl BoundingBox {
    /// Builds a box from an inclusive extent. Fails when any axis of `min`
    /// lies beyond `max`.
    pub fn try_new(kind: BoxKind, min: Coords, max: Coords) -> SyncResult<Self> {
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return Err(SyncError::MalformedInput(format!(
                "{:?} has inverted extent {} .. {}",
                kind, min, max
            )));
        }
        Ok(BoundingBox { kind, min, max, metadata: BoxMetadata::None })
    }

    /// Builds a box from any two opposite corners.
    pub fn from_corners(kind: BoxKind, a: Coords, b: Coords) -> Self {
        BoundingBox {
            kind,
            min: Coords::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Coords::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
            metadata: BoxMetadata::None,
        }
    }

    pub fn with_metadata(mut self, metadata: BoxMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn kind(&self) -> BoxKind { self.kind }
    pub fn min(&self) -> Coords { self.min }
    pub fn max(&self) -> Coords { self.max }
    pub fn metadata(&self) -> &BoxMetadata { &self.metadata }

    pub fn contains(&self, pos: Coords) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x &&
        pos.y >= self.min.y && pos.y <= self.max.y &&
        pos.z >= self.min.z && pos.z <= self.max.z
    }

    /// Seahash over the identity fields. Stable across processes, suitable as
    /// a wire key for transports that do not ship the full box on removal.
    pub fn stable_hash(&self) -> u64 {
        let mut bytes = Vec::with_capacity(48);
        bytes.push(self.kind.tag());
        for c in [self.min, self.max] {
            bytes.extend_from_slice(&c.x.to_le_bytes());
            bytes.extend_from_slice(&c.y.to_le_bytes());
            bytes.extend_from_slice(&c.z.to_le_bytes());
        }
        if let BoxMetadata::Village { center, radius, color, spawns_iron_golems, layout } = self.metadata {
            bytes.extend_from_slice(&center.x.to_le_bytes());
            bytes.extend_from_slice(&center.y.to_le_bytes());
            bytes.extend_from_slice(&center.z.to_le_bytes());
            bytes.extend_from_slice(&radius.to_le_bytes());
            bytes.extend_from_slice(&[color.r, color.g, color.b, spawns_iron_golems as u8]);
            bytes.extend_from_slice(&layout.to_le_bytes());
        }
        seahash::hash(&bytes)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} .. {}", self.kind, self.min, self.max)
    }
}

// --- World data ---
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldData {
    pub seed: i64,
    pub spawn_x: i32,
    pub spawn_z: i32,
}

impl WorldData {
    pub fn new(seed: i64, spawn_x: i32, spawn_z: i32) -> Self {
        WorldData { seed, spawn_x, spawn_z }
    }
}

// --- Lifecycle events ---

/// Inbound signals from the engine, consumed in push order.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    WorldLoaded { dimension: DimensionId, seed: i64, spawn_x: i32, spawn_z: i32 },
    ChunkLoaded { dimension: DimensionId, chunk: ChunkSnapshot },
    VillageTick { dimension: DimensionId, villages: Vec<LiveVillage> },
    ServerTick,
    ObserverJoined { observer: ObserverId, dimension: DimensionId },
    ObserverLeft { observer: ObserverId },
    ObserverChangedDimension { observer: ObserverId, dimension: DimensionId },
    SpawnerBroken { dimension: DimensionId, pos: Coords },
}
