// bbox_sync/server/src/core/error.rs
use thiserror::Error;

use crate::network::transport::TransportError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Malformed input data: {0}")]
    MalformedInput(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
