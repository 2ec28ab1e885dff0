// bbox_sync/server/src/core/config.rs
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use super::constants::*;
use super::error::{SyncError, SyncResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VillageConfig {
    pub iron_golem_min_doors: usize,
    pub iron_golem_min_villagers: usize,
}

impl Default for VillageConfig {
    fn default() -> Self {
        VillageConfig {
            iron_golem_min_doors: DEFAULT_IRON_GOLEM_MIN_DOORS,
            iron_golem_min_villagers: DEFAULT_IRON_GOLEM_MIN_VILLAGERS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub tick_rate: u64,
    pub event_batch_size: usize,
    /// Keep every cache when the session ends instead of clearing it.
    pub keep_cache_between_sessions: bool,
    /// Rendering toggle, carried through untouched.
    pub outer_boxes_only: bool,
    pub metrics_listen_addr: Option<SocketAddr>,
    pub village: VillageConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            tick_rate: DEFAULT_TICK_RATE,
            event_batch_size: DEFAULT_EVENT_BATCH_SIZE,
            keep_cache_between_sessions: false,
            outer_boxes_only: false,
            metrics_listen_addr: None,
            village: VillageConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_yaml_str(source: &str) -> SyncResult<Self> {
        let config: SyncConfig = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.tick_rate == 0 {
            return Err(SyncError::Config("tick_rate must be greater than zero".into()));
        }
        if self.event_batch_size == 0 {
            return Err(SyncError::Config("event_batch_size must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(1000 / self.tick_rate.max(1))
    }
}
