// bbox_sync/server/src/server/mod.rs
pub mod instance;
pub mod sync_controller;
pub mod sync_loop;
