// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Extraction of the fixed-shape 32-byte [`Key`] from a [`Cid`].

use cid::Cid;

/// Byte width of a [`Key`].
pub const KEY_LEN: usize = 32;

/// `CIDv1 | DAG-CBOR | Blake2b-256-minimal | digest-len 32`, as raw CID bytes.
///
/// Any CID that does not start with exactly these six bytes, or whose total
/// length differs from [`KEY_LEN`] + 6, is "non-indexable": it can never be
/// served by an index/CAR overlay and always falls through to the next
/// layer.
pub const PREFIX: [u8; 6] = [0x01, 0x71, 0xA0, 0xE4, 0x02, 0x20];

/// The raw 32-byte multihash digest extracted from an indexable CID.
pub type Key = [u8; KEY_LEN];

/// Returns the [`Key`] for `cid` if it is indexable, `None` otherwise.
pub fn as_key(cid: &Cid) -> Option<Key> {
    let bytes = cid.to_bytes();
    if bytes.len() != PREFIX.len() + KEY_LEN || !bytes.starts_with(&PREFIX) {
        return None;
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes[PREFIX.len()..]);
    Some(key)
}
