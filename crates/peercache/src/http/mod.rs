// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! HTTP transport between cache nodes.
//!
//! Every node runs an [`HttpPool`]. The pool serves `GET <base_path><group>/<key>` for the
//! groups in its [`Registry`](crate::Registry), and acts as the [`PeerPicker`](crate::PeerPicker)
//! that routes each key to the node that owns it on a consistent-hash ring. Remote fetches
//! go through [`HttpGetter`]. A `200` response carries the raw value bytes; any other
//! status is a peer error.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use peercache::http::HttpPool;
//! use peercache::{GetterFn, Registry};
//!
//! # async fn example() -> std::io::Result<()> {
//! let registry = Arc::new(Registry::new());
//! let scores = registry.make_group(
//!     "scores",
//!     2 << 10,
//!     GetterFn::new(|key: String| async move { Ok(Bytes::from(key)) }),
//! );
//!
//! let pool = Arc::new(HttpPool::builder("http://10.0.0.1:8001", Arc::clone(&registry)).build());
//! pool.set_peers(["http://10.0.0.1:8001", "http://10.0.0.2:8001", "http://10.0.0.3:8001"]);
//! scores.register_peers(Arc::clone(&pool));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8001").await?;
//! pool.serve(listener).await;
//! # Ok(())
//! # }
//! ```

mod getter;
mod pool;

pub use getter::HttpGetter;
pub use pool::{HttpPool, HttpPoolBuilder};

use pct_str::{PctStr, PctString, UriReserved};

/// Path prefix under which peer requests are served unless configured otherwise.
pub const DEFAULT_BASE_PATH: &str = "/_peercache/";

/// Virtual nodes per peer on the hash ring unless configured otherwise.
pub const DEFAULT_REPLICAS: usize = 50;

/// Percent-encodes a group name or key so it fits in one path segment.
fn escape(segment: &str) -> String {
    PctString::encode(segment.chars(), UriReserved::Any).into_string()
}

/// Reverses [`escape`]. Returns `None` for malformed percent-encoding.
fn unescape(segment: &str) -> Option<String> {
    PctStr::new(segment).ok().map(PctStr::decode)
}
