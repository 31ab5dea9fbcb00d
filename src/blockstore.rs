// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The capability-set trait implemented by every layer in the overlay stack,
//! plus an in-memory backing store.

use std::sync::{Arc, RwLock};

use cid::Cid;

use crate::error::BlockstoreError;

/// A content-addressed store. Every method has a sensible default in terms
/// of [`Blockstore::get`]/[`Blockstore::put`] so implementers only need to
/// override what they can do better (e.g. a CAR overlay overrides `view` to
/// avoid an extra copy, and refuses mutation entirely).
pub trait Blockstore {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, BlockstoreError>;

    fn put(&self, cid: &Cid, data: &[u8]) -> Result<(), BlockstoreError>;

    fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError> {
        Ok(self.get(cid)?.is_some())
    }

    fn put_many(&self, blocks: &[(Cid, Vec<u8>)]) -> Result<(), BlockstoreError> {
        for (cid, data) in blocks {
            self.put(cid, data)?;
        }
        Ok(())
    }

    fn delete_block(&self, _cid: &Cid) -> Result<(), BlockstoreError> {
        Err(BlockstoreError::Unsupported)
    }

    fn delete_many(&self, _cids: &[Cid]) -> Result<(), BlockstoreError> {
        Err(BlockstoreError::Unsupported)
    }

    fn get_size(&self, cid: &Cid) -> Result<Option<usize>, BlockstoreError> {
        Ok(self.get(cid)?.map(|data| data.len()))
    }

    /// Enumerates every key held directly by this layer (not layers behind
    /// it). Overlay layers that only index a fixed CAR leave this
    /// unsupported, matching the original's `AllKeysChan` panic.
    fn all_keys_chan(&self) -> Result<Vec<Cid>, BlockstoreError> {
        Err(BlockstoreError::Unsupported)
    }

    /// Whether this layer re-derives and checks the hash on every read.
    fn hash_on_read(&self, _enabled: bool) {}
}

/// Zero-copy read extension, kept separate from [`Blockstore`] so the core
/// trait stays object-safe (`dyn Blockstore`) for layer stacking. Any
/// `Blockstore` gets a default `View` impl that falls back to an owned
/// [`Blockstore::get`]; layers backed by a positioned reader (e.g. a CAR
/// overlay) override it to hand the callback a borrow straight out of their
/// file.
pub trait View: Blockstore {
    fn view<R>(&self, cid: &Cid, f: impl FnOnce(&[u8]) -> R) -> Result<Option<R>, BlockstoreError> {
        Ok(self.get(cid)?.map(|data| f(&data)))
    }
}

impl<T: Blockstore + ?Sized> View for T {}

/// Forwards through a shared reference so a stack of layers can be wired up
/// behind `Arc<dyn Blockstore + Send + Sync>` without every layer needing
/// its own generic parameter for "the previous layer's concrete type".
impl<T: Blockstore + ?Sized> Blockstore for Arc<T> {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, BlockstoreError> {
        (**self).get(cid)
    }

    fn put(&self, cid: &Cid, data: &[u8]) -> Result<(), BlockstoreError> {
        (**self).put(cid, data)
    }

    fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError> {
        (**self).has(cid)
    }

    fn put_many(&self, blocks: &[(Cid, Vec<u8>)]) -> Result<(), BlockstoreError> {
        (**self).put_many(blocks)
    }

    fn delete_block(&self, cid: &Cid) -> Result<(), BlockstoreError> {
        (**self).delete_block(cid)
    }

    fn delete_many(&self, cids: &[Cid]) -> Result<(), BlockstoreError> {
        (**self).delete_many(cids)
    }

    fn get_size(&self, cid: &Cid) -> Result<Option<usize>, BlockstoreError> {
        (**self).get_size(cid)
    }

    fn all_keys_chan(&self) -> Result<Vec<Cid>, BlockstoreError> {
        (**self).all_keys_chan()
    }

    fn hash_on_read(&self, enabled: bool) {
        (**self).hash_on_read(enabled)
    }
}

/// A plain in-memory, read-write [`Blockstore`], used as the innermost
/// layer of the stack and in tests.
#[derive(Debug, Default)]
pub struct MutableStore {
    blocks: RwLock<ahash::HashMap<Cid, Vec<u8>>>,
}

impl MutableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Blockstore for MutableStore {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, BlockstoreError> {
        Ok(self.blocks.read().unwrap().get(cid).cloned())
    }

    fn put(&self, cid: &Cid, data: &[u8]) -> Result<(), BlockstoreError> {
        self.blocks.write().unwrap().insert(*cid, data.to_vec());
        Ok(())
    }

    fn has(&self, cid: &Cid) -> Result<bool, BlockstoreError> {
        Ok(self.blocks.read().unwrap().contains_key(cid))
    }

    fn delete_block(&self, cid: &Cid) -> Result<(), BlockstoreError> {
        self.blocks.write().unwrap().remove(cid);
        Ok(())
    }

    fn delete_many(&self, cids: &[Cid]) -> Result<(), BlockstoreError> {
        let mut blocks = self.blocks.write().unwrap();
        for cid in cids {
            blocks.remove(cid);
        }
        Ok(())
    }

    fn all_keys_chan(&self) -> Result<Vec<Cid>, BlockstoreError> {
        Ok(self.blocks.read().unwrap().keys().copied().collect())
    }
}
