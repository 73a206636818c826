// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::{Arc, OnceLock};

use peercache_flight::Coalescer;
use peercache_lru::ConcurrentCache;

use crate::getter::DynGetter;
use crate::{ByteView, Error, Getter, Peer, PeerPicker, Result};

/// A named cache namespace.
///
/// A group ties together one data source, one byte-bounded local cache and (optionally)
/// one peer topology. Lookups go through three steps:
///
/// 1. the local cache;
/// 2. on a miss, the peer that owns the key, if a [`PeerPicker`] is registered and names
///    a remote node;
/// 3. the data source, when the key is owned locally or the owning peer failed.
///
/// Concurrent misses for the same key share a single load. Only values loaded from the
/// data source are cached locally; values fetched from a peer are returned as-is and
/// stay cached on the owning node.
///
/// Groups are usually created with [`Registry::make_group`](crate::Registry::make_group)
/// so the HTTP server can find them by name.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use peercache::{Error, Group, GetterFn};
///
/// # async fn example() -> peercache::Result<()> {
/// let scores = Group::new(
///     "scores",
///     2 << 10,
///     GetterFn::new(|key: String| async move {
///         match key.as_str() {
///             "Tom" => Ok(Bytes::from_static(b"630")),
///             _ => Err(Error::source_failed(format!("{key} not exist"))),
///         }
///     }),
/// );
///
/// assert_eq!(scores.get("Tom").await?.to_string(), "630");
/// assert!(scores.get("Nobody").await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct Group {
    name: String,
    getter: Arc<DynGetter<'static>>,
    cache: ConcurrentCache<ByteView>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    loader: Coalescer<String, Result<ByteView>>,
}

impl Group {
    /// Creates a group that caches at most `cache_bytes` bytes (zero means unbounded) and
    /// loads misses through `getter`.
    pub fn new(name: impl Into<String>, cache_bytes: usize, getter: impl Getter + 'static) -> Self {
        Self {
            name: name.into(),
            getter: DynGetter::new_arc(getter),
            cache: ConcurrentCache::new(cache_bytes),
            peers: OnceLock::new(),
            loader: Coalescer::new(),
        }
    }

    /// The group's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of values held in the local cache.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Attaches the peer topology used to route misses to their owners.
    ///
    /// # Panics
    ///
    /// Panics if peers were already registered for this group.
    pub fn register_peers<P>(&self, peers: Arc<P>)
    where
        P: PeerPicker + 'static,
    {
        let peers: Arc<dyn PeerPicker> = peers;
        assert!(
            self.peers.set(peers).is_ok(),
            "peers already registered for group {}",
            self.name
        );
    }

    /// Returns the value for `key`, loading it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::EmptyKey`](crate::ErrorKind::EmptyKey) for an empty key
    /// without touching the cache or the data source, and the data source's error when a
    /// local load fails.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::empty_key());
        }

        if let Some(value) = self.cache.get(key) {
            tracing::debug!(group.name = %self.name, cache.key = key, "cache hit");
            return Ok(value);
        }

        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        self.loader
            .work(key.to_owned(), || async {
                if let Some(peer) = self.peers.get().and_then(|peers| peers.pick_peer(key)) {
                    match self.get_from_peer(&peer, key).await {
                        Ok(value) => return Ok(value),
                        Err(error) => tracing::warn!(
                            group.name = %self.name,
                            cache.key = key,
                            peer = peer.name(),
                            error = %error,
                            "peer fetch failed, loading locally"
                        ),
                    }
                }

                self.get_locally(key).await
            })
            .await
    }

    async fn get_from_peer(&self, peer: &Peer, key: &str) -> Result<ByteView> {
        let bytes = peer.get(&self.name, key).await?;
        Ok(ByteView::new(bytes))
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        tracing::debug!(group.name = %self.name, cache.key = key, "loading from data source");
        let value = ByteView::new(self.getter.get(key).await?);
        self.cache.add(key, value.clone());
        Ok(value)
    }
}

impl fmt::Debug for Group {
    #[cfg_attr(test, mutants::skip)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache_bytes", &self.cache.max_bytes())
            .field("cache_len", &self.cache.len())
            .field("has_peers", &self.peers.get().is_some())
            .finish_non_exhaustive()
    }
}
