// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The data source a group falls back to on a cache miss.

use std::fmt;

use bytes::Bytes;

use crate::Result;

/// Loads the value for a key from the system of record.
///
/// A group calls its getter only when the key is not cached locally and no peer owns it
/// (or the owning peer failed). Calls are coalesced per key, so an implementation sees at
/// most one concurrent call for any given key from one group.
///
/// Report failures with [`Error::source_failed`](crate::Error::source_failed). Errors are
/// returned to every waiting caller and are never cached.
///
/// For closures, use [`GetterFn`].
#[dynosaur::dynosaur(pub(crate) DynGetter = dyn(box) Getter, bridge(none))]
pub trait Getter: Send + Sync {
    /// Loads the value for `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Adapts an async closure into a [`Getter`].
///
/// The closure receives an owned copy of the key so the returned future does not borrow
/// from the caller.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use peercache::{Error, GetterFn};
///
/// let getter = GetterFn::new(|key: String| async move {
///     match key.as_str() {
///         "Tom" => Ok(Bytes::from_static(b"630")),
///         _ => Err(Error::source_failed(format!("{key} not exist"))),
///     }
/// });
/// # let _ = getter;
/// ```
#[derive(Clone)]
pub struct GetterFn<F>(F);

impl<F> GetterFn<F> {
    /// Wraps `func`.
    #[must_use]
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F> fmt::Debug for GetterFn<F> {
    #[cfg_attr(test, mutants::skip)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterFn").finish_non_exhaustive()
    }
}

impl<F, Fut> Getter for GetterFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Bytes>> + Send,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Bytes>> + Send {
        (self.0)(key.to_owned())
    }
}
