// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A value that can report how many bytes it occupies in a cache.
///
/// The reported size is what the cache charges against its byte budget, so it should be
/// stable for as long as the value lives in the cache.
pub trait Sizeable {
    /// Returns the number of bytes this value accounts for.
    fn size(&self) -> usize;
}

impl Sizeable for String {
    fn size(&self) -> usize {
        self.len()
    }
}

impl Sizeable for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl Sizeable for Box<[u8]> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl Sizeable for &'static str {
    fn size(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_byte_lengths() {
        assert_eq!("PsyDuck".to_string().size(), 7);
        assert_eq!(vec![0_u8; 3].size(), 3);
        assert_eq!(vec![1_u8, 2].into_boxed_slice().size(), 2);
        assert_eq!("héllo".size(), 6);
    }
}
