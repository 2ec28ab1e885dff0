// bbox_sync/server/src/systems/discovery/village_colors.rs
use crate::core::types::Color;
use ahash::AHashMap;
use parking_lot::Mutex;

const PALETTE: [Color; 16] = [
    Color::rgb(255, 0, 0),
    Color::rgb(255, 127, 0),
    Color::rgb(255, 255, 0),
    Color::rgb(127, 255, 0),
    Color::rgb(0, 255, 0),
    Color::rgb(0, 255, 127),
    Color::rgb(0, 255, 255),
    Color::rgb(0, 127, 255),
    Color::rgb(0, 0, 255),
    Color::rgb(127, 0, 255),
    Color::rgb(255, 0, 255),
    Color::rgb(255, 0, 127),
    Color::rgb(255, 255, 255),
    Color::rgb(127, 127, 127),
    Color::rgb(127, 63, 0),
    Color::rgb(0, 127, 63),
];

#[derive(Default)]
struct ColorAssignments {
    by_village: AHashMap<i32, Color>,
    next: usize,
}

/// Stable per-village colors, assigned in order of first sight.
#[derive(Default)]
pub struct VillageColorCache {
    assignments: Mutex<ColorAssignments>,
}

impl VillageColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_for(&self, village_id: i32) -> Color {
        let mut guard = self.assignments.lock();
        if let Some(color) = guard.by_village.get(&village_id) {
            return *color;
        }
        let color = PALETTE[guard.next % PALETTE.len()];
        guard.next += 1;
        guard.by_village.insert(village_id, color);
        color
    }

    pub fn len(&self) -> usize {
        self.assignments.lock().by_village.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut guard = self.assignments.lock();
        guard.by_village.clear();
        guard.next = 0;
    }
}
