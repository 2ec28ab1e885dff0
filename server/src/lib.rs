// bbox_sync/server/src/lib.rs
pub mod core;
pub mod concurrent;
pub mod entities;
pub mod world;
pub mod server;
pub mod network;
pub mod operational;
pub mod systems;
pub mod client;

pub use crate::client::replica::BoundingBoxReplica;
pub use crate::server::instance::BoundingBoxServer;
