// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Seams between a group and the rest of the cluster.
//!
//! A [`PeerPicker`] decides which node owns a key. A [`PeerGetter`] fetches a value from
//! one remote node. [`Peer`] is the cloneable handle a picker returns. The HTTP transport
//! in [`http`](crate::http) implements both, and tests plug in in-memory doubles.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::Result;

/// Fetches values from one remote node.
#[dynosaur::dynosaur(pub(crate) DynPeerGetter = dyn(box) PeerGetter, bridge(none))]
pub trait PeerGetter: Send + Sync {
    /// Fetches the value of `key` in the group called `group` from the remote node.
    ///
    /// Failures should be reported with [`Error::peer_failed`](crate::Error::peer_failed).
    fn get(&self, group: &str, key: &str) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Chooses the node that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the remote peer that owns `key`, or `None` when the key is owned by the
    /// local node or there are no peers.
    ///
    /// For a fixed peer set the answer must be the same for the same key on every node.
    fn pick_peer(&self, key: &str) -> Option<Peer>;
}

/// A cloneable handle to a remote node.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use peercache::{Peer, PeerGetter, Result};
///
/// struct Echo;
///
/// impl PeerGetter for Echo {
///     async fn get(&self, group: &str, key: &str) -> Result<Bytes> {
///         Ok(Bytes::from(format!("{group}/{key}")))
///     }
/// }
///
/// # async fn example() {
/// let peer = Peer::new("echo", Echo);
/// assert_eq!(peer.get("scores", "Tom").await.unwrap(), "scores/Tom");
/// # }
/// ```
#[derive(Clone)]
pub struct Peer {
    name: Arc<str>,
    getter: Arc<DynPeerGetter<'static>>,
}

impl Peer {
    /// Creates a handle called `name` that fetches through `getter`.
    pub fn new(name: impl Into<Arc<str>>, getter: impl PeerGetter + 'static) -> Self {
        Self {
            name: name.into(),
            getter: DynPeerGetter::new_arc(getter),
        }
    }

    /// The peer's name, typically its base URL.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches `key` in `group` from this peer.
    pub async fn get(&self, group: &str, key: &str) -> Result<Bytes> {
        self.getter.get(group, key).await
    }
}

impl fmt::Debug for Peer {
    #[cfg_attr(test, mutants::skip)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer").field("name", &self.name).finish_non_exhaustive()
    }
}
