// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Leader/follower structure based on singleflight-async by ihciah
// Original: https://github.com/ihciah/singleflight-async
// Licensed under MIT/Apache-2.0

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Coalesces concurrent lookups for the same key into a single execution.
//!
//! This crate provides [`Coalescer`], the "singleflight" building block that stops a burst
//! of cache misses for one key from turning into a burst of expensive fetches. The first
//! caller for a key (the "leader") runs its loader; every caller that arrives for the same
//! key while the leader is running (a "follower") waits and receives a clone of the
//! leader's output. Its own loader is never called.
//!
//! Calls for different keys do not wait on each other. The internal map is locked only to
//! register or look up a call, never while a loader runs.
//!
//! # Example
//!
//! ```
//! use peercache_flight::Coalescer;
//!
//! # async fn example() {
//! let coalescer: Coalescer<String, Result<String, String>> = Coalescer::new();
//!
//! let value = coalescer
//!     .work("user:123".to_string(), || async {
//!         // Runs once even if many callers ask for user:123 at the same time.
//!         Ok("expensive result".to_string())
//!     })
//!     .await;
//! # let _ = value;
//! # }
//! ```
//!
//! Outputs are shared by clone, so fallible loaders usually return a `Result` whose error
//! type is `Clone`. Every caller attached to one execution sees the same success or the
//! same error.
//!
//! # Cancellation and Panics
//!
//! - If the leader's future is dropped or its loader panics before producing a value, one
//!   waiting follower takes over and runs its own loader; the rest keep waiting on it.
//! - Once a call completes, its entry is removed. The next caller for that key starts a
//!   fresh execution.
//! - A call abandoned by its leader and by every follower leaves no entry behind.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::ptr;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Result slot shared by every caller attached to one execution.
///
/// The leader holds the lock while its loader runs, so followers queue on `lock()` and
/// find the result once it is released.
type Slot<T> = AsyncMutex<Option<T>>;

type Mapping<K, T> = Arc<Mutex<HashMap<K, Weak<Slot<T>>>>>;

/// Deduplicates concurrent work by key.
///
/// See the [crate documentation](crate) for the semantics.
pub struct Coalescer<K, T> {
    mapping: Mapping<K, T>,
}

impl<K, T> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self {
            mapping: Arc::default(),
        }
    }
}

impl<K, T> Debug for Coalescer<K, T> {
    #[cfg_attr(test, mutants::skip)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coalescer").field("in_flight", &self.mapping.lock().len()).finish()
    }
}

/// Role a caller was assigned when it registered.
enum Role<K, T>
where
    K: Hash + Eq,
{
    Leader(Leader<K, T>),
    Follower(Follower<K, T>),
}

/// Holds the slot lock for the execution it leads.
///
/// Dropping it releases the followers. When the leader finishes or is abandoned with nobody
/// waiting, the map entry is removed on the way out.
struct Leader<K, T>
where
    K: Hash + Eq,
{
    guard: Option<OwnedMutexGuard<Option<T>>>,
    key: K,
    mapping: Mapping<K, T>,
}

impl<K, T> Leader<K, T>
where
    K: Hash + Eq,
    T: Clone,
{
    async fn run<F, Fut>(mut self, func: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let value = func().await;
        if let Some(guard) = self.guard.as_mut() {
            **guard = Some(value.clone());
        }
        value
    }
}

impl<K, T> Drop for Leader<K, T>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };

        {
            let mut mapping = self.mapping.lock();
            let slot = OwnedMutexGuard::mutex(&guard);
            let registered = mapping
                .get(&self.key)
                .is_some_and(|entry| ptr::eq(entry.as_ptr(), Arc::as_ptr(slot)));

            // Followers obtain their handle under the map lock, so a strong count of one
            // (the guard itself) means nobody can take over an abandoned call.
            let finished = guard.is_some();
            if registered && (finished || Arc::strong_count(slot) == 1) {
                mapping.remove(&self.key);
            }
        }

        drop(guard);
    }
}

/// A caller waiting on someone else's execution.
///
/// Dropping it before the slot is released (for example when the caller times out) after
/// the leader was abandoned leaves nobody to run the call, so the map entry is removed on
/// the way out.
struct Follower<K, T>
where
    K: Hash + Eq,
{
    slot: Arc<Slot<T>>,
    key: K,
    mapping: Mapping<K, T>,
}

impl<K, T> Drop for Follower<K, T>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        let mut mapping = self.mapping.lock();
        let registered = mapping
            .get(&self.key)
            .is_some_and(|entry| ptr::eq(entry.as_ptr(), Arc::as_ptr(&self.slot)));

        // A live leader or another waiter would hold a second handle.
        if registered && Arc::strong_count(&self.slot) == 1 {
            mapping.remove(&self.key);
        }
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty coalescer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `func` for `key` unless a call for `key` is already in flight, in which case the
    /// returned future resolves to that call's output instead.
    ///
    /// The caller is registered as leader or follower when `work` is called, not when the
    /// returned future is first polled.
    pub fn work<F, Fut>(&self, key: K, func: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
        T: Clone,
    {
        let role = self.register(&key);
        let mapping = Arc::clone(&self.mapping);

        async move {
            match role {
                Role::Leader(leader) => leader.run(func).await,
                Role::Follower(follower) => {
                    let guard = Arc::clone(&follower.slot).lock_owned().await;
                    if let Some(value) = guard.as_ref() {
                        return value.clone();
                    }

                    // The leader went away without a result. Take over. The guard keeps the
                    // slot alive, so dropping the follower handle leaves the entry in place.
                    drop(follower);
                    let leader = Leader {
                        guard: Some(guard),
                        key,
                        mapping,
                    };
                    leader.run(func).await
                }
            }
        }
    }

    /// Number of keys with a call currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.mapping.lock().len()
    }

    fn register(&self, key: &K) -> Role<K, T> {
        let mut mapping = self.mapping.lock();

        if let Some(slot) = mapping.get(key).and_then(Weak::upgrade) {
            return Role::Follower(Follower {
                slot,
                key: key.clone(),
                mapping: Arc::clone(&self.mapping),
            });
        }

        let slot = Arc::new(AsyncMutex::new(None));
        mapping.insert(key.clone(), Arc::downgrade(&slot));
        let guard = match slot.try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => unreachable!("a freshly created slot cannot be locked"),
        };

        Role::Leader(Leader {
            guard: Some(guard),
            key: key.clone(),
            mapping: Arc::clone(&self.mapping),
        })
    }
}
