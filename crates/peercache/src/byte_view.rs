// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use bytes::Bytes;
use peercache_lru::Sizeable;

/// An immutable view of a cached value.
///
/// Cloning is cheap (a reference count bump), so the same value can sit in the cache and
/// be handed to any number of callers without copying. There is no way to mutate the bytes
/// through a `ByteView`.
///
/// # Examples
///
/// ```
/// use peercache::ByteView;
///
/// let view = ByteView::from("630");
/// assert_eq!(view.len(), 3);
/// assert_eq!(view.to_string(), "630");
///
/// let mut copy = view.byte_slice();
/// copy[0] = b'7';
/// assert_eq!(view.as_bytes(), b"630");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView(Bytes);

impl ByteView {
    /// Wraps `bytes` without copying.
    #[must_use]
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// Number of bytes in the value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the value has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an owned copy of the bytes. Changing the copy leaves the view untouched.
    #[must_use]
    pub fn byte_slice(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Borrows the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the underlying buffer, sharing rather than copying it.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl Sizeable for ByteView {
    fn size(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Shows the bytes as text, replacing invalid UTF-8.
impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<String> for ByteView {
    fn from(text: String) -> Self {
        Self(Bytes::from(text))
    }
}

impl From<&'static str> for ByteView {
    fn from(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }
}

impl From<ByteView> for Bytes {
    fn from(view: ByteView) -> Self {
        view.0
    }
}
