//! Content-addressed memoization for expensive geometry.
//!
//! Keys are canonicalized vertex lists: translated so the bounding-box min
//! corner sits at the origin, then quantized, so two congruent pieces at
//! different positions share an entry. Lookups are always safe to miss;
//! computing fresh is always correct.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Cache key built from a canonicalized vertex list plus an integer tag
/// (typically the rotation angle in quantized degrees).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    coords: Vec<(i64, i64)>,
    tag: i64,
}

impl ShapeKey {
    /// Builds a key from raw vertices.
    ///
    /// Vertices are translated so their min corner is the origin and
    /// quantized by `quantum` before hashing, so coordinates that differ by
    /// less than the tolerance collapse to the same key.
    pub fn from_points(points: &[(f64, f64)], tag: f64, quantum: f64) -> Self {
        let (min_x, min_y) = points.iter().fold(
            (f64::INFINITY, f64::INFINITY),
            |(mx, my), &(x, y)| (mx.min(x), my.min(y)),
        );
        let scale = 1.0 / quantum;
        let coords = points
            .iter()
            .map(|&(x, y)| {
                (
                    ((x - min_x) * scale).round() as i64,
                    ((y - min_y) * scale).round() as i64,
                )
            })
            .collect();
        Self {
            coords,
            tag: (tag * scale).round() as i64,
        }
    }
}

/// Hit/miss counters for cache observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to compute.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe memoization cache for derived shapes.
pub struct ShapeCache<T> {
    entries: RwLock<HashMap<ShapeKey, Arc<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    capacity: usize,
}

impl<T> ShapeCache<T> {
    /// Creates an empty cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Creates an empty cache bounded to `capacity` entries. When full, new
    /// results are returned uncached rather than evicting.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            capacity,
        }
    }

    /// Returns the cached value for `key`, computing and storing it on a
    /// miss.
    pub fn get_or_compute<F>(&self, key: ShapeKey, compute: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(found) = self.entries.read().expect("cache lock poisoned").get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(found);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(compute());

        let mut entries = self.entries.write().expect("cache lock poisoned");
        // A concurrent writer may have raced us; keep the first entry so
        // all callers share one allocation.
        if let Some(found) = entries.get(&key) {
            return Arc::clone(found);
        }
        if entries.len() < self.capacity {
            entries.insert(key, Arc::clone(&value));
        }
        value
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// Returns whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all entries, keeping the counters.
    pub fn clear(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }

    /// Returns the hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<T> Default for ShapeCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_translation_invariant() {
        let a = ShapeKey::from_points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0)], 0.0, 1e-9);
        let b = ShapeKey::from_points(&[(3.0, 7.0), (13.0, 7.0), (13.0, 12.0)], 0.0, 1e-9);
        assert_eq!(a, b);
    }

    #[test]
    fn key_distinguishes_tags() {
        let a = ShapeKey::from_points(&[(0.0, 0.0), (1.0, 0.0)], 0.0, 1e-9);
        let b = ShapeKey::from_points(&[(0.0, 0.0), (1.0, 0.0)], 90.0, 1e-9);
        assert_ne!(a, b);
    }

    #[test]
    fn hit_and_miss_accounting() {
        let cache: ShapeCache<u32> = ShapeCache::new();
        let key = ShapeKey::from_points(&[(0.0, 0.0), (1.0, 1.0)], 0.0, 1e-9);

        let first = cache.get_or_compute(key.clone(), || 42);
        let second = cache.get_or_compute(key, || unreachable!("must hit"));

        assert_eq!(*first, 42);
        assert_eq!(*second, 42);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn capacity_bound_is_not_exceeded() {
        let cache: ShapeCache<usize> = ShapeCache::with_capacity(2);
        for i in 0..5 {
            let key = ShapeKey::from_points(&[(i as f64, 0.0), (0.0, i as f64 + 1.0)], 0.0, 1e-9);
            cache.get_or_compute(key, || i);
        }
        assert!(cache.len() <= 2);
    }
}
