// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::Mutex;

use crate::{LruCache, Sizeable};

/// A thread-safe [`LruCache`] that is built on first insertion.
///
/// All access goes through a single mutex, held only for the duration of the underlying
/// O(1) operation. Lookups against a cache that has never been written to miss without
/// allocating anything, which keeps `ConcurrentCache::default()` free to construct.
///
/// Values are handed out by clone, so `V` should be cheap to clone.
///
/// # Examples
///
/// ```
/// use peercache_lru::ConcurrentCache;
///
/// let cache = ConcurrentCache::new(1024);
/// assert!(cache.get("key").is_none());
///
/// cache.add("key", "value".to_string());
/// assert_eq!(cache.get("key").as_deref(), Some("value"));
/// ```
#[derive(Debug)]
pub struct ConcurrentCache<V> {
    max_bytes: usize,
    inner: Mutex<Option<LruCache<V>>>,
}

impl<V> Default for ConcurrentCache<V> {
    fn default() -> Self {
        Self {
            max_bytes: 0,
            inner: Mutex::new(None),
        }
    }
}

impl<V> ConcurrentCache<V>
where
    V: Sizeable + Clone,
{
    /// Creates a cache that will hold at most `max_bytes` once built. Zero means unbounded.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            inner: Mutex::new(None),
        }
    }

    /// Returns a clone of the cached value, marking it as most recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().as_mut()?.get(key).cloned()
    }

    /// Inserts or replaces `key`, building the underlying cache if needed.
    pub fn add(&self, key: impl Into<String>, value: V) {
        self.inner
            .lock()
            .get_or_insert_with(|| LruCache::new(self.max_bytes))
            .add(key, value);
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, LruCache::len)
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes charged against the budget by the live entries.
    pub fn bytes(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, LruCache::current_bytes)
    }

    /// The configured byte budget. Zero means unbounded.
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    #[cfg(test)]
    fn is_initialized(&self) -> bool {
        self.inner.lock().is_some()
    }
}
