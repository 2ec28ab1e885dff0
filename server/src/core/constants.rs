// bbox_sync/server/src/core/constants.rs
use std::time::Duration;

pub const DEFAULT_TICK_RATE: u64 = 20;
pub const DEFAULT_TICK_DURATION: Duration = Duration::from_millis(1000 / DEFAULT_TICK_RATE);
pub const DEFAULT_EVENT_BATCH_SIZE: usize = 1024;

// World constants
pub const CHUNK_SIZE: i32 = 16;
pub const WORLD_MIN_Y: i32 = 0;
pub const WORLD_MAX_Y: i32 = 255;

// Mob spawner spawn volume, measured from the spawner block
pub const SPAWNER_RANGE_XZ: i32 = 4;
pub const SPAWNER_RANGE_Y: i32 = 1;

// World spawn
pub const WORLD_SPAWN_RADIUS: i32 = 10;
pub const SPAWN_CHUNK_RADIUS: i32 = 9;
pub const LAZY_SPAWN_CHUNK_RADIUS: i32 = 11;

// Villages
pub const DEFAULT_IRON_GOLEM_MIN_DOORS: usize = 21;
pub const DEFAULT_IRON_GOLEM_MIN_VILLAGERS: usize = 10;
pub const IRON_GOLEM_SPAWN_XZ: i32 = 8;
pub const IRON_GOLEM_SPAWN_Y: i32 = 3;
