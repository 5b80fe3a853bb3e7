//! LruCache - in-memory store with write-ordered eviction
//!
//! Entries are kept in an `IndexMap` ordered by last write: the front is the
//! least recently written entry, the back the most recent. Writing an existing
//! key moves it to the back. Reads do not change the order.
//!
//! After every insertion, entries are evicted from the front until both the
//! item count and aggregate byte size are within the configured limits. An
//! entry heavier than `max_byte_size` on its own is therefore never retained.

use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::debug;

use crate::cache::Cache;
use crate::config::CacheConfig;

/// Computes the byte weight of an entry
pub type Weigher<K, V> = Arc<dyn Fn(&K, &V) -> u64 + Send + Sync>;

struct Entry<V> {
    value: V,
    weight: u64,
}

struct Inner<K, V> {
    entries: IndexMap<K, Entry<V>>,
    bytes: u64,
}

impl<K: Hash + Eq, V> Inner<K, V> {
    fn take(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.shift_remove(key)?;
        self.bytes = self.bytes.saturating_sub(entry.weight);
        Some(entry.value)
    }
}

/// Bounded cache evicting the least recently written entries
pub struct LruCache<K, V> {
    config: CacheConfig,
    weigher: Weigher<K, V>,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Hash + Eq + 'static, V: 'static> LruCache<K, V> {
    /// Create a cache that weighs every entry as `size_of::<V>()`
    pub fn new(config: CacheConfig) -> Self {
        Self::with_weigher(config, |_, _| std::mem::size_of::<V>() as u64)
    }

    /// Create a cache with no limits
    pub fn unbounded() -> Self {
        Self::new(CacheConfig::unbounded())
    }

    /// Create a cache with a custom entry weigher
    pub fn with_weigher(config: CacheConfig, weigher: impl Fn(&K, &V) -> u64 + Send + Sync + 'static) -> Self {
        debug!(?config, "LruCache::with_weigher: called");
        Self {
            config,
            weigher: Arc::new(weigher),
            inner: Mutex::new(Inner {
                entries: IndexMap::new(),
                bytes: 0,
            }),
        }
    }

    /// Aggregate weight of all stored entries
    pub fn byte_size(&self) -> u64 {
        self.lock().bytes
    }

    /// Keys from least to most recently written
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.lock().entries.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict(&self, inner: &mut Inner<K, V>) {
        let mut evicted = 0usize;
        while self.config.is_exceeded(inner.entries.len(), inner.bytes) {
            match inner.entries.shift_remove_index(0) {
                Some((_, entry)) => {
                    inner.bytes = inner.bytes.saturating_sub(entry.weight);
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            debug!(
                evicted,
                items = inner.entries.len(),
                bytes = inner.bytes,
                "LruCache::evict: trimmed to limits"
            );
        }
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: K, value: V) {
        let weight = (self.weigher)(&key, &value);
        let mut inner = self.lock();
        inner.take(&key);
        inner.bytes = inner.bytes.saturating_add(weight);
        inner.entries.insert(key, Entry { value, weight });
        self.evict(&mut inner);
    }

    fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.lock().take(key)
    }

    fn remove_all(&self) {
        debug!("LruCache::remove_all: called");
        let mut inner = self.lock();
        inner.entries.clear();
        inner.bytes = 0;
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn config(&self) -> CacheConfig {
        self.config
    }
}
