// bbox_sync/server/src/concurrent/mod.rs
pub mod bounding_box_cache;
pub mod event_queue;
