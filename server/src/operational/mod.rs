// bbox_sync/server/src/operational/mod.rs
pub mod monitoring;
