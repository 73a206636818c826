// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache lookups.

use std::fmt;

/// What went wrong during a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The key was empty. Empty keys are rejected before the cache or the data source is
    /// consulted.
    EmptyKey,
    /// The data source could not produce a value.
    Source,
    /// A remote peer could not produce a value.
    Peer,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::EmptyKey => "key is required",
            Self::Source => "data source failed",
            Self::Peer => "peer fetch failed",
        };
        f.write_str(message)
    }
}

/// An error from a cache lookup.
///
/// Errors are cheap to clone so that one failed load can be handed to every caller that
/// was waiting on it. Use [`Error::kind`] to branch on the failure and
/// [`std::error::Error::source()`] to reach the underlying cause.
///
/// No backtrace is captured. The message is the kind followed by the cause chain, and is
/// what the HTTP server sends back to peers.
///
/// # Example
///
/// ```
/// use peercache::{Error, ErrorKind};
///
/// let error = Error::source_failed("row not found");
/// assert_eq!(error.kind(), ErrorKind::Source);
/// ```
#[ohno::error]
#[backtrace(disabled)]
#[derive(Clone)]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a data source error from any cause.
    ///
    /// Data source implementations use this to report that a key could not be loaded.
    pub fn source_failed(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Source, cause)
    }

    /// Creates a peer error from any cause.
    ///
    /// Peer transports use this to report that a remote fetch failed.
    pub fn peer_failed(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Peer, cause)
    }

    pub(crate) fn empty_key() -> Self {
        Self::new(ErrorKind::EmptyKey)
    }

    /// The kind of failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A specialized [`Result`] type for cache lookups.
pub type Result<T> = std::result::Result<T, Error>;
