// bbox_sync/server/src/client/mod.rs
pub mod replica;
