//! Per-resolution memoization of rasterized land masks.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::debug;

use climate_common::OverlayResult;

use crate::geojson::BoundaryPolygon;
use crate::mask::LandMask;

/// Default number of distinct resolutions kept alive.
const DEFAULT_CAPACITY: usize = 8;

/// LRU cache of land masks keyed by (width, height).
///
/// Masks are immutable after construction and shared via `Arc`, so a
/// cached resolution costs one rasterization for the life of the
/// process (until evicted).
#[derive(Debug)]
pub struct MaskCache {
    inner: Mutex<LruCache<(usize, usize), Arc<LandMask>>>,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The cached mask for a resolution, if one exists. Lets callers
    /// skip loading boundary data entirely on a warm cache.
    pub fn get(&self, width: usize, height: usize) -> Option<Arc<LandMask>> {
        self.inner
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(&(width, height)).map(Arc::clone))
    }

    /// Fetch the mask for a resolution, rasterizing on first use.
    pub fn get_or_rasterize(
        &self,
        polygons: &[BoundaryPolygon],
        width: usize,
        height: usize,
    ) -> OverlayResult<Arc<LandMask>> {
        let key = (width, height);
        if let Ok(mut cache) = self.inner.lock() {
            if let Some(mask) = cache.get(&key) {
                return Ok(Arc::clone(mask));
            }
        }

        debug!(width, height, polygons = polygons.len(), "rasterizing land mask");
        let mask = Arc::new(LandMask::rasterize(polygons, width, height)?);

        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, Arc::clone(&mask));
        }
        Ok(mask)
    }
}

impl Default for MaskCache {
    fn default() -> Self {
        Self::new()
    }
}
