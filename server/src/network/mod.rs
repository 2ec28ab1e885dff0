// bbox_sync/server/src/network/mod.rs
pub mod messages;
pub mod transport;
