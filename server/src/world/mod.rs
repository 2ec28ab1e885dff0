// bbox_sync/server/src/world/mod.rs
pub mod chunk;
pub mod registry;
pub mod village;
