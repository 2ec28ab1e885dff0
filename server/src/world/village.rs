// bbox_sync/server/src/world/village.rs
use crate::core::types::Coords;

/// One village as currently tracked by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveVillage {
    /// Engine-side identity, stable while the village exists.
    pub id: i32,
    pub center: Coords,
    pub radius: i32,
    pub villagers: usize,
    pub doors: Vec<Coords>,
    /// Lot/field extents as (min, max).
    pub lots: Vec<(Coords, Coords)>,
}

impl LiveVillage {
    pub fn new(id: i32, center: Coords, radius: i32) -> Self {
        LiveVillage { id, center, radius, villagers: 0, doors: Vec::new(), lots: Vec::new() }
    }

    pub fn with_villagers(mut self, villagers: usize) -> Self {
        self.villagers = villagers;
        self
    }

    pub fn with_doors(mut self, doors: impl IntoIterator<Item = Coords>) -> Self {
        self.doors.extend(doors);
        self
    }

    pub fn with_lot(mut self, min: Coords, max: Coords) -> Self {
        self.lots.push((min, max));
        self
    }

    pub fn door_count(&self) -> usize {
        self.doors.len()
    }
}
