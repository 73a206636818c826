// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Byte-bounded least-recently-used caches.
//!
//! This crate provides two layers:
//!
//! - [`LruCache`], a single-threaded store bounded by the total byte footprint of its
//!   entries. When an insertion pushes the footprint over budget, least-recently-used
//!   entries are evicted until it fits again.
//! - [`ConcurrentCache`], which guards an [`LruCache`] behind a mutex and constructs it
//!   lazily on the first insertion.
//!
//! Values report their footprint through the [`Sizeable`] trait. The footprint of an entry
//! is `key.len() + value.size()`.
//!
//! # Example
//!
//! ```
//! use peercache_lru::LruCache;
//!
//! // Exactly enough room for "k1" -> "v1" and "k2" -> "v2".
//! let mut cache = LruCache::new(8);
//! cache.add("k1", "v1".to_string());
//! cache.add("k2", "v2".to_string());
//!
//! // Touch k1 so that k2 becomes the eviction candidate.
//! assert!(cache.get("k1").is_some());
//! cache.add("k3", "v3".to_string());
//!
//! assert!(cache.get("k2").is_none());
//! assert_eq!(cache.len(), 2);
//! ```
//!
//! # Thread Safety
//!
//! [`LruCache`] mutates recency order on every read and is therefore only usable through
//! `&mut self`. Share it across threads through [`ConcurrentCache`].

mod concurrent;
mod list;
mod lru;
mod size;

#[doc(inline)]
pub use concurrent::ConcurrentCache;
#[doc(inline)]
pub use lru::{EvictionCallback, LruCache};
#[doc(inline)]
pub use size::Sizeable;
