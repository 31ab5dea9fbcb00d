// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Sorted-key lookup table over an externally built, tightly packed index
//! file: key → (offset, max-size) in a companion CAR file.
//!
//! Row layout (40 bytes, big-endian):
//!
//! ```text
//! ├──────────── key (32) ───────────┼── offset (5) ──┼─ max_size64 (3) ─┤
//! 0                                32                37                40
//! ```
//!
//! The first and last rows of the file are reserved header/footer slots and
//! are never interpreted by this reader.

use crate::error::IndexError;
use crate::key::{Key, KEY_LEN};

const ROW_LEN: usize = 40;
const OFFSET_LEN: usize = 5;

/// One parsed row: a key plus its location in the companion CAR file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub key: Key,
    pub offset: u64,
    pub max_size64: u64,
}

impl Row {
    /// Upper bound, in bytes, on the framed record's length at `offset`.
    pub fn max_size(&self) -> u64 {
        64 * self.max_size64
    }
}

fn u16be(b: &[u8]) -> u64 {
    u64::from(b[0]) << 8 | u64::from(b[1])
}

fn u24be(b: &[u8]) -> u64 {
    u64::from(b[0]) << 16 | u16be(&b[1..3])
}

fn u40be(b: &[u8]) -> u64 {
    u24be(&b[0..3]) << 16 | u16be(&b[3..5])
}

/// An index file loaded fully into memory and treated as immutable.
///
/// Rows `1..=size()` (the file's row 0 and last row are reserved) MUST be
/// sorted strictly ascending by key; this is an invariant enforced by the
/// external builder and relied upon, not re-verified, by [`MemoryIndex::find`].
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    raw: Vec<u8>,
}

impl MemoryIndex {
    /// Wraps an already-loaded index buffer, validating its length shape.
    pub fn new(raw: Vec<u8>) -> Result<Self, IndexError> {
        if raw.len() < 2 * ROW_LEN || raw.len() % ROW_LEN != 0 {
            return Err(IndexError::InvalidLength { len: raw.len() });
        }
        Ok(Self { raw })
    }

    /// Reads an index file from disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, IndexError> {
        let raw = std::fs::read(path)?;
        Self::new(raw)
    }

    /// Number of addressable rows (excludes the reserved header/footer).
    pub fn size(&self) -> usize {
        self.raw.len() / ROW_LEN - 2
    }

    fn row_bytes(&self, i: usize) -> &[u8] {
        let start = (i + 1) * ROW_LEN;
        &self.raw[start..start + ROW_LEN]
    }

    pub fn key(&self, i: usize) -> Key {
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&self.row_bytes(i)[..KEY_LEN]);
        key
    }

    pub fn offset(&self, i: usize) -> u64 {
        u40be(&self.row_bytes(i)[KEY_LEN..KEY_LEN + OFFSET_LEN])
    }

    pub fn max_size64(&self, i: usize) -> u64 {
        u24be(&self.row_bytes(i)[KEY_LEN + OFFSET_LEN..])
    }

    pub fn row(&self, i: usize) -> Row {
        Row {
            key: self.key(i),
            offset: self.offset(i),
            max_size64: self.max_size64(i),
        }
    }

    /// Binary search for `k`. Returns `Some(row)` iff some row's key equals
    /// `k` exactly; an empty index, or a key strictly greater than the last
    /// row's key, always misses.
    pub fn find(&self, k: &Key) -> Option<Row> {
        let size = self.size();
        let mut lo = 0usize;
        let mut hi = size;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid).as_slice() < k.as_slice() {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < size && self.key(lo) == *k {
            Some(self.row(lo))
        } else {
            None
        }
    }
}
