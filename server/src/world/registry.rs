// bbox_sync/server/src/world/registry.rs
use crate::concurrent::bounding_box_cache::{BoundingBoxCache, CacheSnapshot};
use crate::core::config::VillageConfig;
use crate::core::types::DimensionId;
use crate::systems::discovery::village_colors::VillageColorCache;
use crate::systems::discovery::DimensionProcessors;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Cache and discovery state of one dimension.
pub struct DimensionState {
    pub dimension: DimensionId,
    pub cache: Arc<BoundingBoxCache>,
    /// `None` on the receiving side, which only mirrors what it is sent.
    pub processors: Option<Mutex<DimensionProcessors>>,
}

/// Owns one [`DimensionState`] per dimension identity, created lazily.
pub struct DimensionRegistry {
    dimensions: DashMap<DimensionId, Arc<DimensionState>>,
    colors: Arc<VillageColorCache>,
    village_config: VillageConfig,
    with_processors: bool,
}

impl DimensionRegistry {
    pub fn new(village_config: VillageConfig) -> Self {
        DimensionRegistry {
            dimensions: DashMap::new(),
            colors: Arc::new(VillageColorCache::new()),
            village_config,
            with_processors: true,
        }
    }

    /// Registry holding caches only.
    pub fn without_processors() -> Self {
        DimensionRegistry {
            with_processors: false,
            ..Self::new(VillageConfig::default())
        }
    }

    pub fn get_or_create(&self, dimension: &DimensionId) -> Arc<DimensionState> {
        if let Some(existing) = self.dimensions.get(dimension) {
            return existing.value().clone();
        }
        self.dimensions
            .entry(dimension.clone())
            .or_insert_with(|| {
                let cache = Arc::new(BoundingBoxCache::new());
                let processors = self.with_processors.then(|| {
                    Mutex::new(DimensionProcessors::for_dimension(
                        dimension,
                        cache.clone(),
                        self.colors.clone(),
                        self.village_config.clone(),
                    ))
                });
                info!("[Registry] Created dimension {} ({:?})", dimension, dimension.kind());
                Arc::new(DimensionState { dimension: dimension.clone(), cache, processors })
            })
            .value()
            .clone()
    }

    /// `None` means the dimension has no data yet.
    pub fn get(&self, dimension: &DimensionId) -> Option<Arc<DimensionState>> {
        self.dimensions.get(dimension).map(|entry| entry.value().clone())
    }

    pub fn cache(&self, dimension: &DimensionId) -> Option<Arc<BoundingBoxCache>> {
        self.get(dimension).map(|state| state.cache.clone())
    }

    /// Read-only view for local display. Empty for unknown dimensions.
    pub fn snapshot(&self, dimension: &DimensionId) -> CacheSnapshot {
        self.cache(dimension).map(|cache| cache.snapshot()).unwrap_or_default()
    }

    pub fn dimensions(&self) -> Vec<DimensionId> {
        self.dimensions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn colors(&self) -> &Arc<VillageColorCache> {
        &self.colors
    }

    /// Full reset: processor state, caches, colors, then the dimensions
    /// themselves.
    pub fn clear_all(&self) {
        for entry in self.dimensions.iter() {
            if let Some(processors) = entry.value().processors.as_ref() {
                processors.lock().clear();
            }
            entry.value().cache.clear();
        }
        self.dimensions.clear();
        self.colors.clear();
        info!("[Registry] Cleared all dimensions");
    }
}
