// bbox_sync/server/src/world/chunk.rs
use crate::core::types::Coords;

/// Raw extent of one structure piece as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructurePiece {
    pub min: Coords,
    pub max: Coords,
}

/// A structure start found in a chunk: engine id, outer extent, pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureStart {
    pub id: String,
    pub min: Coords,
    pub max: Coords,
    pub pieces: Vec<StructurePiece>,
}

impl StructureStart {
    pub fn new(id: impl Into<String>, min: Coords, max: Coords) -> Self {
        StructureStart { id: id.into(), min, max, pieces: Vec::new() }
    }

    pub fn with_piece(mut self, min: Coords, max: Coords) -> Self {
        self.pieces.push(StructurePiece { min, max });
        self
    }
}

/// Static data of a freshly loaded chunk relevant to discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSnapshot {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub structure_starts: Vec<StructureStart>,
    /// Positions of mob spawner block entities.
    pub spawners: Vec<Coords>,
}

impl ChunkSnapshot {
    pub fn new(chunk_x: i32, chunk_z: i32) -> Self {
        ChunkSnapshot { chunk_x, chunk_z, ..Default::default() }
    }

    pub fn with_structure(mut self, start: StructureStart) -> Self {
        self.structure_starts.push(start);
        self
    }

    pub fn with_spawner(mut self, pos: Coords) -> Self {
        self.spawners.push(pos);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.structure_starts.is_empty() && self.spawners.is_empty()
    }
}
