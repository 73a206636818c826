// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A distributed read-through cache.
//!
//! Values are organized into named [`Group`]s. Each group owns a byte-bounded LRU cache and
//! a [`Getter`] that loads values from the system of record. When several nodes run
//! together, every key has exactly one owning node, chosen by consistent hashing, and the
//! other nodes fetch it from the owner instead of hitting the data source themselves.
//!
//! A lookup:
//!
//! 1. rejects empty keys;
//! 2. returns the locally cached value if there is one;
//! 3. otherwise asks the registered [`PeerPicker`] for the owner, and fetches from that
//!    [`Peer`] when it is a remote node;
//! 4. falls back to the group's [`Getter`] when the key is owned locally or the remote
//!    fetch failed, and caches the result.
//!
//! Steps 3 and 4 run at most once per key at a time: concurrent misses for the same key
//! wait for the first one and share its result, success or error.
//!
//! Values are immutable [`ByteView`]s. Nothing expires; entries leave the cache only when
//! the byte budget forces the least recently used ones out.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use peercache::{Error, GetterFn, Registry};
//!
//! # async fn example() -> peercache::Result<()> {
//! let registry = Registry::new();
//! let scores = registry.make_group(
//!     "scores",
//!     2 << 10,
//!     GetterFn::new(|key: String| async move {
//!         match key.as_str() {
//!             "Tom" => Ok(Bytes::from_static(b"630")),
//!             "Jack" => Ok(Bytes::from_static(b"589")),
//!             _ => Err(Error::source_failed(format!("{key} not exist"))),
//!         }
//!     }),
//! );
//!
//! let tom = scores.get("Tom").await?;
//! assert_eq!(tom.to_string(), "630");
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `http` (default): the [`http`] module with an HTTP peer transport and server built on
//!   `hyper`.

mod byte_view;
mod error;
mod getter;
mod group;
#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;
mod peers;
mod registry;

pub use byte_view::ByteView;
pub use error::{Error, ErrorKind, Result};
pub use getter::{Getter, GetterFn};
pub use group::Group;
pub use peers::{Peer, PeerGetter, PeerPicker};
pub use registry::Registry;
