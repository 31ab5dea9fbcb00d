// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Access-tracing overlay: wraps any [`Blockstore`] and records every CID
//! read or written through it, so a replay run can later emit a minimal CAR
//! of exactly what it touched.

use cid::Cid;

use crate::blockstore::{Blockstore, View};
use crate::dedup::Cids;
use crate::error::BlockstoreError;

/// Wraps `inner`, fanning reads into `reads` and writes into `writes`.
///
/// A read is recorded only once the block is actually found: `get` records
/// iff `inner` returns `Ok(Some(_))`, and `view` records at the point its
/// callback is invoked (which only happens on a hit), never on a miss or an
/// error. A block that was never found anywhere must never show up in the
/// emitted trace.
pub struct HookIpld<B> {
    inner: B,
    reads: Cids,
    writes: Cids,
}

impl<B: Blockstore> HookIpld<B> {
    pub fn new(inner: B, reads: Cids, writes: Cids) -> Self {
        Self {
            inner,
            reads,
            writes,
        }
    }
}

impl<B: Blockstore> Blockstore for HookIpld<B> {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, BlockstoreError> {
        let result = self.inner.get(cid);
        if let Ok(Some(_)) = &result {
            self.reads.record(*cid);
        }
        result
    }

    fn put(&self, cid: &Cid, data: &[u8]) -> Result<(), BlockstoreError> {
        self.writes.record(*cid);
        self.inner.put(cid, data)
    }

    fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError> {
        self.inner.has(cid)
    }

    fn put_many(&self, blocks: &[(Cid, Vec<u8>)]) -> Result<(), BlockstoreError> {
        for (cid, _) in blocks {
            self.writes.record(*cid);
        }
        self.inner.put_many(blocks)
    }

    fn delete_block(&self, cid: &Cid) -> Result<(), BlockstoreError> {
        self.inner.delete_block(cid)
    }

    fn delete_many(&self, cids: &[Cid]) -> Result<(), BlockstoreError> {
        self.inner.delete_many(cids)
    }

    fn get_size(&self, cid: &Cid) -> Result<Option<usize>, BlockstoreError> {
        self.inner.get_size(cid)
    }

    fn all_keys_chan(&self) -> Result<Vec<Cid>, BlockstoreError> {
        self.inner.all_keys_chan()
    }

    fn hash_on_read(&self, enabled: bool) {
        self.inner.hash_on_read(enabled);
    }
}

/// Records the read at the moment `inner`'s callback is invoked, mirroring
/// [`Blockstore::get`]'s "record iff the block was found" rule while still
/// giving a zero-copy-capable `inner` the chance to hand back a borrow
/// straight out of its own storage rather than an owned copy.
impl<B: Blockstore> View for HookIpld<B> {
    fn view<R>(&self, cid: &Cid, f: impl FnOnce(&[u8]) -> R) -> Result<Option<R>, BlockstoreError> {
        let reads = &self.reads;
        let seen = *cid;
        self.inner.view(cid, |data| {
            reads.record(seen);
            f(data)
        })
    }
}
