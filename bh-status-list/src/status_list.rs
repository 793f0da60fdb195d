// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use bherror::Error as BhError;

use crate::{
    compression::{compress_and_encode, decode_and_decompress},
    Error, Result,
};

/// Minimum number of entries of a published list, 16 KiB worth of bits, so
/// that a single index does not single out a small group of holders.
pub const MIN_STATUS_LIST_SIZE: usize = 131_072;

/// A bitstring of statuses, one bit per credential.
///
/// Bit `i` is the `i % 8`-th most significant bit of byte `i / 8`, so index
/// `0` is the most significant bit of the first byte. A set bit means the
/// status (revoked or suspended, depending on the list's purpose) is
/// asserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusList {
    bytes: Vec<u8>,
}

impl StatusList {
    /// A list of at least `size` entries, none asserted.
    ///
    /// The size is rounded up to a whole number of bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size.div_ceil(8)],
        }
    }

    /// A list over the raw bitstring.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decode an `encodedList` value: base64, then GZIP.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        decode_and_decompress(encoded).map(Self::from_bytes)
    }

    /// Encode as an `encodedList` value: GZIP, then base64url without
    /// padding.
    pub fn encode(&self) -> Result<String> {
        compress_and_encode(&self.bytes)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Whether the list has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw bitstring.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the status at `index` is asserted.
    ///
    /// # Errors
    ///
    /// An index outside of the list is [`Error::IndexOutOfBounds`], never a
    /// silent `false`.
    pub fn is_asserted(&self, index: usize) -> Result<bool> {
        let (byte_idx, mask) = self.locate(index)?;

        Ok(self.bytes[byte_idx] & mask != 0)
    }

    /// Assert or clear the status at `index`.
    pub fn set(&mut self, index: usize, asserted: bool) -> Result<()> {
        let (byte_idx, mask) = self.locate(index)?;

        if asserted {
            self.bytes[byte_idx] |= mask;
        } else {
            self.bytes[byte_idx] &= !mask;
        }

        Ok(())
    }

    /// Index of the byte holding `index` and the mask of its bit.
    fn locate(&self, index: usize) -> Result<(usize, u8)> {
        if index >= self.len() {
            return Err(BhError::root(Error::IndexOutOfBounds(self.len(), index)));
        }

        Ok((index / 8, 0x80 >> (index % 8)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::Rng as _;

    use super::*;

    #[test]
    fn bit_zero_is_the_most_significant_bit() {
        // only bit 5 is set
        let list = StatusList::from_bytes(vec![0b0000_0100, 0]);

        assert!(list.is_asserted(5).unwrap());
        assert!(!list.is_asserted(4).unwrap());
        assert!(!list.is_asserted(0).unwrap());
        assert!(!list.is_asserted(15).unwrap());

        let mut list = StatusList::new(16);
        list.set(0, true).unwrap();
        list.set(15, true).unwrap();
        assert_eq!(list.as_bytes(), &[0x80, 0x01]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let list = StatusList::new(10);
        assert_eq!(list.len(), 16);

        assert!(!list.is_asserted(15).unwrap());
        let err = list.is_asserted(16).unwrap_err();
        assert_eq!(err.error, Error::IndexOutOfBounds(16, 16));

        let mut list = StatusList::new(0);
        assert!(list.is_empty());
        let err = list.set(0, true).unwrap_err();
        assert_eq!(err.error, Error::IndexOutOfBounds(0, 0));
    }

    #[test]
    fn set_and_clear() {
        let mut list = StatusList::new(8);

        list.set(3, true).unwrap();
        list.set(3, true).unwrap();
        assert!(list.is_asserted(3).unwrap());

        list.set(3, false).unwrap();
        assert!(!list.is_asserted(3).unwrap());
        assert_eq!(list, StatusList::new(8));
    }

    #[test]
    fn random_statuses_survive_encoding() {
        let mut rng = rand::rng();
        let mut list = StatusList::new(MIN_STATUS_LIST_SIZE);

        let asserted: HashSet<usize> = (0..200)
            .map(|_| rng.random_range(0..MIN_STATUS_LIST_SIZE))
            .collect();
        for &index in &asserted {
            list.set(index, true).unwrap();
        }

        let encoded = list.encode().unwrap();
        // a sparse list compresses well
        assert!(encoded.len() < MIN_STATUS_LIST_SIZE / 8 / 4);

        let decoded = StatusList::from_encoded(&encoded).unwrap();
        assert_eq!(decoded, list);
        for index in 0..MIN_STATUS_LIST_SIZE {
            assert_eq!(decoded.is_asserted(index).unwrap(), asserted.contains(&index));
        }
    }
}
