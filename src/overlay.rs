// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Read-through CAR overlay: a [`crate::blockstore::Blockstore`] backed by a
//! fixed CAR file plus its companion index, delegating every miss (and every
//! mutation) to an inner store.

use std::sync::Arc;

use cid::Cid;
use positioned_io::ReadAt;

use crate::blockstore::{Blockstore, View};
use crate::car;
use crate::error::{BlockstoreError, CarError};
use crate::index::{MemoryIndex, Row};
use crate::key::as_key;

/// One layer of the overlay stack: an index probe followed by a single
/// positional read of the framed record, validated against the CID the
/// caller asked for before the bytes are trusted.
///
/// Layers compose by nesting: each `CidsIpld` holds the next store behind it
/// as `inner`, so a stack of N CAR files is N nested `CidsIpld` values with
/// the innermost mutable store at the bottom.
pub struct CidsIpld<R> {
    reader: R,
    index: MemoryIndex,
    inner: Arc<dyn Blockstore + Send + Sync>,
}

impl<R: ReadAt> CidsIpld<R> {
    pub fn new(reader: R, index: MemoryIndex, inner: Arc<dyn Blockstore + Send + Sync>) -> Self {
        Self {
            reader,
            index,
            inner,
        }
    }

    /// Reads the record at `row`, validating both the CID prefix bytes and
    /// the key before returning the block payload.
    fn read_and_validate(&self, cid: &Cid, row: &Row) -> Result<Vec<u8>, CarError> {
        let max_size = row.max_size() as usize;
        let mut buf = vec![0u8; max_size];
        let n = self
            .reader
            .read_at(row.offset, &mut buf)
            .map_err(CarError::Io)?;
        buf.truncate(n);

        let record = car::read_record(&buf)?;
        if !record.cid.to_bytes().starts_with(&crate::key::PREFIX) {
            return Err(CarError::PrefixMismatch);
        }
        if record.cid != *cid {
            return Err(CarError::KeyMismatch);
        }
        Ok(record.data(&buf).to_vec())
    }

    fn find(&self, cid: &Cid) -> Option<Row> {
        as_key(cid).and_then(|key| self.index.find(&key))
    }

    /// Index-only probe, with no CAR read: true iff this layer's index
    /// names `cid`, regardless of whether the inner store also has it.
    fn has2(&self, cid: &Cid) -> bool {
        self.find(cid).is_some()
    }
}

impl<R: ReadAt> Blockstore for CidsIpld<R> {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, BlockstoreError> {
        match self.find(cid) {
            Some(row) => Ok(Some(self.read_and_validate(cid, &row)?)),
            None => self.inner.get(cid),
        }
    }

    fn put(&self, cid: &Cid, data: &[u8]) -> Result<(), BlockstoreError> {
        // The overlay already holds an authoritative copy; the mutable inner
        // store need not duplicate it. Idempotent: a block this layer
        // already indexes is reported as stored without touching `inner`.
        if self.has2(cid) {
            return Ok(());
        }
        self.inner.put(cid, data)
    }

    fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError> {
        if self.has2(cid) {
            return Ok(true);
        }
        self.inner.has(cid)
    }

    fn put_many(&self, blocks: &[(Cid, Vec<u8>)]) -> Result<(), BlockstoreError> {
        // Retain only blocks this layer doesn't already index, preserving
        // their relative order; the rest are already authoritative here and
        // are reported as stored without being forwarded.
        let retained: Vec<(Cid, Vec<u8>)> = blocks
            .iter()
            .filter(|(cid, _)| !self.has2(cid))
            .cloned()
            .collect();
        if retained.is_empty() {
            return Ok(());
        }
        self.inner.put_many(&retained)
    }

    fn delete_block(&self, _cid: &Cid) -> Result<(), BlockstoreError> {
        Err(BlockstoreError::Unsupported)
    }

    fn delete_many(&self, _cids: &[Cid]) -> Result<(), BlockstoreError> {
        Err(BlockstoreError::Unsupported)
    }

    fn get_size(&self, _cid: &Cid) -> Result<Option<usize>, BlockstoreError> {
        Err(BlockstoreError::Unsupported)
    }

    fn all_keys_chan(&self) -> Result<Vec<Cid>, BlockstoreError> {
        Err(BlockstoreError::Unsupported)
    }

    fn hash_on_read(&self, enabled: bool) {
        self.inner.hash_on_read(enabled);
    }
}

/// Unlike [`Blockstore::get`], `view` checks `inner` *first* and only probes
/// this layer's own index on an inner miss — the original's `CidsIpld.View`
/// tries the wrapped store before falling back to its own CAR, the opposite
/// order from `Get`. Preserved here for bit-exact layering semantics even
/// though it means a direct hit in this layer's own CAR costs an extra
/// `inner` lookup first.
impl<R: ReadAt> View for CidsIpld<R> {
    fn view<Ret>(
        &self,
        cid: &Cid,
        f: impl FnOnce(&[u8]) -> Ret,
    ) -> Result<Option<Ret>, BlockstoreError> {
        if let Some(data) = self.inner.get(cid)? {
            return Ok(Some(f(&data)));
        }
        match self.find(cid) {
            Some(row) => {
                let data = self.read_and_validate(cid, &row)?;
                Ok(Some(f(&data)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::MutableStore;
    use cid::multihash::Multihash;

    const DAG_CBOR: u64 = 0x71;
    const BLAKE2B_256_MIN: u64 = 45601;

    fn indexable_cid(tag: u8) -> Cid {
        let digest = [tag; 32];
        let mh = Multihash::wrap(BLAKE2B_256_MIN, &digest).unwrap();
        Cid::new_v1(DAG_CBOR, mh)
    }

    fn build_car_and_index(entries: &[(Cid, &[u8])]) -> (Vec<u8>, MemoryIndex) {
        let mut car_bytes = Vec::new();
        let header = car::CarHeader::new(vec![]);
        car_bytes.extend_from_slice(&header.to_frame().unwrap());

        let mut rows = vec![0u8; 40]; // header row
        for (cid, data) in entries {
            let offset = car_bytes.len() as u64;
            car::write_record(&mut car_bytes, cid, data);
            let key = as_key(cid).unwrap();
            let max_size64 = (car_bytes.len() as u64 - offset).div_ceil(64);

            let mut row = vec![0u8; 40];
            row[..32].copy_from_slice(&key);
            row[32..37].copy_from_slice(&offset.to_be_bytes()[3..8]);
            row[37..40].copy_from_slice(&max_size64.to_be_bytes()[5..8]);
            rows.extend_from_slice(&row);
        }
        rows.extend_from_slice(&[0u8; 40]); // footer row
        (car_bytes, MemoryIndex::new(rows).unwrap())
    }

    #[test]
    fn hit_reads_directly_and_miss_falls_through() {
        let present = indexable_cid(1);
        let (car_bytes, index) = build_car_and_index(&[(present, b"hello")]);

        let inner = Arc::new(MutableStore::new());
        let absent = indexable_cid(2);
        inner.put(&absent, b"from-inner").unwrap();

        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner);

        assert_eq!(overlay.get(&present).unwrap().as_deref(), Some(&b"hello"[..]));
        assert_eq!(
            overlay.get(&absent).unwrap().as_deref(),
            Some(&b"from-inner"[..])
        );
        assert!(overlay.has(&present).unwrap());
        assert!(overlay.has(&absent).unwrap());

        let missing = indexable_cid(3);
        assert_eq!(overlay.get(&missing).unwrap(), None);
    }

    #[test]
    fn put_delegates_to_inner() {
        let (car_bytes, index) = build_car_and_index(&[]);
        let inner = Arc::new(MutableStore::new());
        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner.clone());

        let cid = indexable_cid(9);
        overlay.put(&cid, b"written-through").unwrap();
        assert_eq!(
            inner.get(&cid).unwrap().as_deref(),
            Some(&b"written-through"[..])
        );
    }

    #[test]
    fn put_on_an_already_indexed_cid_is_a_no_op() {
        let present = indexable_cid(1);
        let (car_bytes, index) = build_car_and_index(&[(present, b"hello")]);
        let inner = Arc::new(MutableStore::new());
        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner.clone());

        overlay.put(&present, b"attempted-overwrite").unwrap();

        assert!(overlay.has(&present).unwrap());
        assert_eq!(inner.get(&present).unwrap(), None, "inner must not be touched");
        assert_eq!(
            overlay.get(&present).unwrap().as_deref(),
            Some(&b"hello"[..]),
            "the overlay's own copy must still be the one served"
        );
    }

    #[test]
    fn put_many_retains_only_cids_not_already_indexed() {
        let present = indexable_cid(1);
        let (car_bytes, index) = build_car_and_index(&[(present, b"hello")]);
        let inner = Arc::new(MutableStore::new());
        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner.clone());

        let fresh_a = indexable_cid(10);
        let fresh_b = indexable_cid(11);
        overlay
            .put_many(&[
                (present, b"ignored".to_vec()),
                (fresh_a, b"a".to_vec()),
                (fresh_b, b"b".to_vec()),
            ])
            .unwrap();

        assert_eq!(inner.get(&present).unwrap(), None);
        assert_eq!(inner.get(&fresh_a).unwrap().as_deref(), Some(&b"a"[..]));
        assert_eq!(inner.get(&fresh_b).unwrap().as_deref(), Some(&b"b"[..]));
    }

    #[test]
    fn view_tries_inner_before_this_layers_own_index() {
        let shadowed = indexable_cid(1);
        let only_in_car = indexable_cid(2);
        let (car_bytes, index) =
            build_car_and_index(&[(shadowed, b"from-car"), (only_in_car, b"car-only")]);

        let inner = Arc::new(MutableStore::new());
        inner.put(&shadowed, b"from-inner").unwrap();

        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner);

        let seen = overlay.view(&shadowed, |data| data.to_vec()).unwrap();
        assert_eq!(
            seen,
            Some(b"from-inner".to_vec()),
            "view must prefer inner over this layer's own CAR"
        );

        let on_inner_miss = overlay.view(&only_in_car, |data| data.to_vec()).unwrap();
        assert_eq!(
            on_inner_miss,
            Some(b"car-only".to_vec()),
            "an inner miss must still fall back to this layer's own index+CAR"
        );

        let nowhere = indexable_cid(3);
        assert_eq!(overlay.view(&nowhere, |_| ()).unwrap(), None);
    }

    #[test]
    fn declared_length_beyond_row_max_size_is_corrupt() {
        // A row whose max_size64 under-quantizes the record it points at: the
        // single speculative read the overlay issues lands short of the
        // uvarint-declared record length, per §8 scenario 4.
        let present = indexable_cid(1);
        let payload = vec![7u8; 200];
        let mut car_bytes = car::CarHeader::new(vec![]).to_frame().unwrap();
        let mut rows = vec![0u8; 40]; // header row
        let offset = car_bytes.len() as u64;
        car::write_record(&mut car_bytes, &present, &payload);

        let mut row = vec![0u8; 40];
        row[..32].copy_from_slice(&as_key(&present).unwrap());
        row[32..37].copy_from_slice(&offset.to_be_bytes()[3..8]);
        row[37..40].copy_from_slice(&1u32.to_be_bytes()[1..4]); // max_size64 = 1 => max_size = 64
        rows.extend_from_slice(&row);
        rows.extend_from_slice(&[0u8; 40]); // footer row
        let index = MemoryIndex::new(rows).unwrap();

        let inner = Arc::new(MutableStore::new());
        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner);

        let err = overlay.get(&present).unwrap_err();
        assert!(matches!(
            err,
            BlockstoreError::Car(CarError::DeclaredLengthOverrun { .. })
        ));
    }

    #[test]
    fn mismatched_prefix_is_reported_distinctly_from_mismatched_key() {
        // A record stored at the right offset with the right 32-byte digest,
        // but under a codec/hash-algorithm pair that doesn't match the fixed
        // indexable prefix: the reader must distinguish this from a plain
        // key mismatch.
        let digest = [1u8; 32];
        let wrong_codec_mh = Multihash::wrap(BLAKE2B_256_MIN, &digest).unwrap();
        let wrong_codec_cid = Cid::new_v1(0x55, wrong_codec_mh); // raw, not DAG-CBOR

        let mut car_bytes = car::CarHeader::new(vec![]).to_frame().unwrap();
        let mut rows = vec![0u8; 40];
        let offset = car_bytes.len() as u64;
        car::write_record(&mut car_bytes, &wrong_codec_cid, b"payload");
        let max_size64 = (car_bytes.len() as u64 - offset).div_ceil(64);

        let mut row = vec![0u8; 40];
        row[..32].copy_from_slice(&digest); // the index still names the expected key
        row[32..37].copy_from_slice(&offset.to_be_bytes()[3..8]);
        row[37..40].copy_from_slice(&max_size64.to_be_bytes()[5..8]);
        rows.extend_from_slice(&row);
        rows.extend_from_slice(&[0u8; 40]);
        let index = MemoryIndex::new(rows).unwrap();

        let queried = indexable_cid(1); // same digest, correct indexable prefix
        let inner = Arc::new(MutableStore::new());
        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner);

        let err = overlay.get(&queried).unwrap_err();
        assert!(matches!(err, BlockstoreError::Car(CarError::PrefixMismatch)));
    }

    #[test]
    fn delete_and_all_keys_are_unsupported() {
        let (car_bytes, index) = build_car_and_index(&[]);
        let inner = Arc::new(MutableStore::new());
        let overlay = CidsIpld::new(car_bytes.as_slice(), index, inner);

        let cid = indexable_cid(1);
        assert!(matches!(
            overlay.delete_block(&cid),
            Err(BlockstoreError::Unsupported)
        ));
        assert!(matches!(
            overlay.all_keys_chan(),
            Err(BlockstoreError::Unsupported)
        ));
    }
}
