// bbox_sync/server/src/systems/mod.rs
pub mod discovery;
