//! Cache capability trait and the no-op store

use std::marker::PhantomData;

use crate::config::CacheConfig;

/// A keyed store the request queue writes successful results into
///
/// Implementations own their synchronization; every method takes `&self` so a
/// single store can be shared between the queue and its callers.
pub trait Cache<K, V>: Send + Sync {
    /// Look up a value
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or replace a value
    fn set(&self, key: K, value: V);

    /// Whether a value is currently stored under `key`
    fn contains(&self, key: &K) -> bool;

    /// Remove and return a value
    fn remove(&self, key: &K) -> Option<V>;

    /// Drop every entry
    fn remove_all(&self);

    /// Number of stored entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured limits
    fn config(&self) -> CacheConfig {
        CacheConfig::unbounded()
    }
}

/// A cache that never stores anything
pub struct NoopCache<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> NoopCache<K, V> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<K, V> Default for NoopCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V> for NoopCache<K, V> {
    fn get(&self, _key: &K) -> Option<V> {
        None
    }

    fn set(&self, _key: K, _value: V) {}

    fn contains(&self, _key: &K) -> bool {
        false
    }

    fn remove(&self, _key: &K) -> Option<V> {
        None
    }

    fn remove_all(&self) {}

    fn len(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_cache_stores_nothing() {
        let cache: NoopCache<String, u32> = NoopCache::new();
        cache.set("a".to_string(), 1);
        assert!(!cache.contains(&"a".to_string()));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.remove(&"a".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_trait_object() {
        let cache: Box<dyn Cache<u64, String>> = Box::new(NoopCache::default());
        cache.set(1, "one".to_string());
        cache.remove_all();
        assert_eq!(cache.len(), 0);
        assert!(cache.config().is_unbounded());
    }
}
