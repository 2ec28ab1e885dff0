// bbox_sync/server/src/entities/mod.rs
pub mod observer;
