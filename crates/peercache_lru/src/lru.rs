// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{self, Debug};

use crate::Sizeable;
use crate::list::{RecencyList, SlotId};

/// Callback invoked with each entry evicted for capacity reasons.
///
/// The callback runs synchronously inside [`LruCache::add`] or [`LruCache::remove_oldest`]
/// and only sees borrowed copies of the evicted key and value; it has no access to the
/// cache it was evicted from.
pub type EvictionCallback<V> = Box<dyn FnMut(&str, &V) + Send>;

#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
}

/// A least-recently-used cache bounded by the total byte footprint of its entries.
///
/// Each entry is charged `key.len() + value.size()` bytes. After every [`add`](Self::add)
/// the cache evicts least-recently-used entries until the charge fits within `max_bytes`
/// again. A `max_bytes` of zero disables the bound.
///
/// Reads count as use: [`get`](Self::get) moves the entry to the most-recently-used end.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use peercache_lru::LruCache;
///
/// let evicted = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&evicted);
///
/// let mut cache = LruCache::with_eviction_callback(10, move |key: &str, _value: &String| {
///     sink.lock().unwrap().push(key.to_string());
/// });
///
/// cache.add("a", "1234".to_string());
/// cache.add("b", "1234".to_string());
/// cache.add("c", "1234".to_string());
///
/// assert_eq!(*evicted.lock().unwrap(), vec!["a".to_string()]);
/// assert_eq!(cache.current_bytes(), 10);
/// ```
pub struct LruCache<V> {
    max_bytes: usize,
    current_bytes: usize,
    index: HashMap<String, SlotId>,
    order: RecencyList<Entry<V>>,
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V: Sizeable> LruCache<V> {
    /// Creates a cache that holds at most `max_bytes` bytes. Zero means unbounded.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            current_bytes: 0,
            index: HashMap::new(),
            order: RecencyList::default(),
            on_evicted: None,
        }
    }

    /// Creates a cache that reports every eviction to `on_evicted`.
    #[must_use]
    pub fn with_eviction_callback(max_bytes: usize, on_evicted: impl FnMut(&str, &V) + Send + 'static) -> Self {
        Self {
            on_evicted: Some(Box::new(on_evicted)),
            ..Self::new(max_bytes)
        }
    }

    /// Looks up `key` and marks it as most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.order.move_to_back(id);
        self.order.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without changing its recency.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&V> {
        let id = self.index.get(key)?;
        self.order.get(*id).map(|entry| &entry.value)
    }

    /// Returns `true` if `key` is present. Does not change recency.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or replaces `key`, then evicts until the byte budget is met.
    ///
    /// Replacing an existing key charges only the size difference between the old and new
    /// value and marks the key as most recently used. A value larger than the whole budget
    /// is accepted and then immediately evicted together with everything else.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Some(&id) = self.index.get(&key) {
            self.order.move_to_back(id);
            if let Some(entry) = self.order.get_mut(id) {
                let old_size = entry.value.size();
                let new_size = value.size();
                entry.value = value;
                self.current_bytes = self.current_bytes - old_size + new_size;
            }
        } else {
            self.current_bytes += key.len() + value.size();
            let id = self.order.push_back(Entry { key: key.clone(), value });
            self.index.insert(key, id);
        }

        while self.max_bytes != 0 && self.current_bytes > self.max_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    /// Evicts the least recently used entry, notifying the eviction callback.
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let entry = self.order.pop_front()?;
        self.index.remove(&entry.key);
        self.current_bytes -= entry.key.len() + entry.value.size();

        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(&entry.key, &entry.value);
        }

        Some((entry.key, entry.value))
    }

    /// Removes `key` explicitly. This is not an eviction, so the callback is not invoked.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let id = self.index.remove(key)?;
        let entry = self.order.remove(id)?;
        self.current_bytes -= entry.key.len() + entry.value.size();
        Some(entry.value)
    }
}

impl<V> LruCache<V> {
    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.len() == 0
    }

    /// Bytes charged against the budget by the live entries.
    #[must_use]
    pub fn current_bytes(&self) -> usize {
        self.current_bytes
    }

    /// The configured byte budget. Zero means unbounded.
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|entry| entry.key.as_str())
    }

    /// Key of the entry that would be evicted next.
    #[must_use]
    pub fn oldest(&self) -> Option<&str> {
        self.order.front().and_then(|id| self.order.get(id)).map(|entry| entry.key.as_str())
    }
}

impl<V> Debug for LruCache<V> {
    #[cfg_attr(test, mutants::skip)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.order.len())
            .field("current_bytes", &self.current_bytes)
            .field("max_bytes", &self.max_bytes)
            .field("has_eviction_callback", &self.on_evicted.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn footprint(cache: &LruCache<String>) -> usize {
        cache.keys().map(|key| key.len() + cache.peek(key).map_or(0, String::len)).sum()
    }

    #[test]
    fn get_on_empty_cache_misses() {
        let mut cache = LruCache::<String>::new(0);
        assert!(cache.get("missing").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn replace_applies_size_delta() {
        let mut cache = LruCache::new(0);
        cache.add("key", "abc".to_string());
        assert_eq!(cache.current_bytes(), 6);

        cache.add("key", "abcdef".to_string());
        assert_eq!(cache.current_bytes(), 9);
        assert_eq!(cache.len(), 1);

        cache.add("key", "a".to_string());
        assert_eq!(cache.current_bytes(), 4);
        assert_eq!(cache.get("key").map(String::as_str), Some("a"));
    }

    #[test]
    fn replace_marks_entry_recent() {
        let mut cache = LruCache::new(0);
        cache.add("a", "1".to_string());
        cache.add("b", "2".to_string());
        cache.add("a", "3".to_string());

        assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn zero_budget_is_unbounded() {
        let mut cache = LruCache::new(0);
        for i in 0..1000 {
            cache.add(format!("key{i}"), "x".repeat(100));
        }
        assert_eq!(cache.len(), 1000);
    }

    #[test]
    fn oversized_value_empties_the_cache() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        let mut cache = LruCache::with_eviction_callback(10, move |key: &str, _: &String| {
            sink.lock().unwrap().push(key.to_string());
        });

        cache.add("a", "1".to_string());
        cache.add("b", "2".to_string());
        cache.add("huge", "0123456789".to_string());

        assert!(cache.is_empty());
        assert_eq!(cache.current_bytes(), 0);
        assert_eq!(*evicted.lock().unwrap(), vec!["a", "b", "huge"]);
    }

    #[test]
    fn explicit_remove_does_not_notify() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut cache = LruCache::with_eviction_callback(0, move |_: &str, _: &String| {
            *counter.lock().unwrap() += 1;
        });

        cache.add("a", "1".to_string());
        assert_eq!(cache.remove("a").as_deref(), Some("1"));
        assert_eq!(cache.remove("a"), None);
        assert_eq!(cache.current_bytes(), 0);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn remove_oldest_returns_lru_entry() {
        let mut cache = LruCache::new(0);
        cache.add("a", "1".to_string());
        cache.add("b", "2".to_string());
        cache.get("a");

        assert_eq!(cache.oldest(), Some("b"));
        assert_eq!(cache.remove_oldest(), Some(("b".to_string(), "2".to_string())));
        assert_eq!(cache.remove_oldest(), Some(("a".to_string(), "1".to_string())));
        assert_eq!(cache.remove_oldest(), None);
    }

    #[test]
    fn peek_does_not_touch_recency() {
        let mut cache = LruCache::new(0);
        cache.add("a", "1".to_string());
        cache.add("b", "2".to_string());

        assert_eq!(cache.peek("a").map(String::as_str), Some("1"));
        assert!(cache.contains("a"));
        assert_eq!(cache.oldest(), Some("a"));
    }

    #[test]
    fn byte_accounting_matches_live_entries() {
        let mut cache = LruCache::new(64);
        let mut seed: u32 = 7;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let key = format!("k{}", seed % 17);
            let value = "v".repeat((seed % 13) as usize);
            if seed % 5 == 0 {
                cache.get(&key);
            } else {
                cache.add(key, value);
            }

            assert_eq!(cache.current_bytes(), footprint(&cache));
            assert!(cache.current_bytes() <= cache.max_bytes());
        }
    }

    #[test]
    fn debug_output_reports_accounting() {
        let mut cache = LruCache::new(100);
        cache.add("a", "1".to_string());
        let debug = format!("{cache:?}");
        assert!(debug.contains("current_bytes: 2"), "{debug}");
        assert!(debug.contains("max_bytes: 100"), "{debug}");
    }
}
