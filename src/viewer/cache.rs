//! LRU cache for rendered surfaces
//!
//! Keys include the full viewport transform, so a render finished under
//! superseded parameters can never be served for the current ones.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::engine::{RenderParams, Surface};

/// Cache key for rendered surfaces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page number (1-indexed)
    pub page: usize,
    /// Scale factor (stored as millionths for stable hashing)
    pub scale_millionths: u32,
    /// Rotation in degrees
    pub rotation_degrees: u16,
}

impl CacheKey {
    /// Create a cache key from render parameters
    #[must_use]
    pub fn from_params(page: usize, params: &RenderParams) -> Self {
        Self {
            page,
            scale_millionths: (params.scale * 1_000_000.0) as u32,
            rotation_degrees: params.rotation.degrees(),
        }
    }
}

/// LRU cache for rendered surfaces
pub struct SurfaceCache {
    cache: LruCache<CacheKey, Arc<Surface>>,
}

impl SurfaceCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Get a cached surface, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<Surface>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a surface into the cache, returning an Arc to the data
    pub fn insert(&mut self, key: CacheKey, surface: Surface) -> Arc<Surface> {
        let arc = Arc::new(surface);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Clear all cached surfaces
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Invalidate all cached versions of a specific page
    pub fn invalidate_page(&mut self, page: usize) {
        let keys_to_remove: Vec<_> = self
            .cache
            .iter()
            .filter(|(k, _)| k.page == page)
            .map(|(k, _)| *k)
            .collect();

        for key in keys_to_remove {
            self.cache.pop(&key);
        }
    }

    /// Number of cached surfaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cache capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Rotation;

    fn test_params(scale: f32) -> RenderParams {
        RenderParams {
            scale,
            rotation: Rotation::Deg0,
        }
    }

    fn test_surface(page: usize, scale: f32) -> Surface {
        Surface {
            pixels: vec![0; 12],
            width: 2,
            height: 2,
            page,
            scale,
            rotation: Rotation::Deg0,
        }
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = SurfaceCache::new(10);
        let key = CacheKey::from_params(1, &test_params(1.0));

        cache.insert(key, test_surface(1, 1.0));

        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = SurfaceCache::new(2);
        let params = test_params(1.0);

        for page in 1..=3 {
            let key = CacheKey::from_params(page, &params);
            cache.insert(key, test_surface(page, 1.0));
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::from_params(1, &params)));
        assert!(cache.contains(&CacheKey::from_params(2, &params)));
        assert!(cache.contains(&CacheKey::from_params(3, &params)));
    }

    #[test]
    fn keys_distinguish_scale_and_rotation() {
        let base = CacheKey::from_params(1, &test_params(1.0));
        let zoomed = CacheKey::from_params(1, &test_params(1.5));
        let rotated = CacheKey::from_params(
            1,
            &RenderParams {
                scale: 1.0,
                rotation: Rotation::Deg90,
            },
        );

        assert_ne!(base, zoomed);
        assert_ne!(base, rotated);
    }

    #[test]
    fn cache_invalidate_all() {
        let mut cache = SurfaceCache::new(10);
        let params = test_params(1.0);

        for page in 1..=5 {
            cache.insert(CacheKey::from_params(page, &params), test_surface(page, 1.0));
        }

        assert_eq!(cache.len(), 5);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_invalidate_page() {
        let mut cache = SurfaceCache::new(10);

        // Two versions of page 1 at different scales
        cache.insert(
            CacheKey::from_params(1, &test_params(1.0)),
            test_surface(1, 1.0),
        );
        cache.insert(
            CacheKey::from_params(1, &test_params(1.5)),
            test_surface(1, 1.5),
        );

        let kept = CacheKey::from_params(2, &test_params(1.0));
        cache.insert(kept, test_surface(2, 1.0));

        assert_eq!(cache.len(), 3);

        cache.invalidate_page(1);

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&kept));
    }
}
