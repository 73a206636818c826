// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Consistent hashing for assigning cache keys to peers.
//!
//! [`HashRing`] places every peer on a 32-bit hash ring several times ("virtual nodes") and
//! assigns each key to the first virtual node at or after the key's own hash, wrapping
//! around at the top of the ring. With `N` peers each one owns roughly `1/N` of the key
//! space, and adding a peer only moves the keys that now fall on its virtual nodes.
//!
//! Ownership is a pure function of the key, the peer set and the hash function, so every
//! node configured with the same peers agrees on who owns what.
//!
//! # Example
//!
//! ```
//! use peercache_ring::HashRing;
//!
//! let mut ring = HashRing::new(50);
//! ring.add_peers(["http://10.0.0.1:8001", "http://10.0.0.2:8001"]);
//!
//! let owner = ring.get_peer("user:42").expect("ring has peers");
//! assert_eq!(ring.get_peer("user:42"), Some(owner));
//! ```

use std::collections::{BTreeSet, HashMap};

/// Hash function used to place peers and keys on the ring.
pub type HashFn = fn(&[u8]) -> u32;

/// The default ring hash: CRC-32 (IEEE).
///
/// Every node in a cluster must use the same hash function, otherwise they disagree about
/// key ownership.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// A consistent-hashing ring with a fixed number of virtual nodes per peer.
#[derive(Debug, Clone)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    ring: Vec<u32>,
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Creates an empty ring that places `replicas` virtual nodes per peer, hashed with
    /// [`crc32`].
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is 0.
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, crc32)
    }

    /// Creates an empty ring with a custom hash function.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is 0.
    #[must_use]
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        assert!(replicas > 0, "a hash ring needs at least one replica per peer");
        Self {
            hash,
            replicas,
            ring: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Adds peers to the ring.
    ///
    /// The `i`-th virtual node of peer `name` sits at `hash(format!("{i}{name}"))`. Adding a
    /// peer that is already present duplicates its virtual nodes, so each peer must be added
    /// once.
    pub fn add_peers<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let point = (self.hash)(format!("{i}{peer}").as_bytes());
                self.ring.push(point);
                self.owners.insert(point, peer.to_string());
            }
        }
        self.ring.sort_unstable();
    }

    /// Returns the peer that owns `key`, or `None` if no peers were added.
    #[must_use]
    pub fn get_peer(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let index = self.ring.partition_point(|&point| point < hash) % self.ring.len();
        self.owners.get(&self.ring[index]).map(String::as_str)
    }

    /// Number of virtual nodes on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if no peers were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Virtual nodes per peer.
    #[must_use]
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Distinct peer names on the ring, sorted.
    #[must_use]
    pub fn peers(&self) -> Vec<&str> {
        self.owners
            .values()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[cfg(test)]
    fn points(&self) -> &[u32] {
        &self.ring
    }
}
