// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! A deduplicating, many-producer set of [`Cid`]s fed over a channel and
//! drained by a single background task — the access-tracing primitive
//! [`crate::hook::HookIpld`] uses to record reads and writes without
//! serializing callers on a shared lock.

use std::collections::HashSet;

use cid::Cid;
use flume::Sender;
use tokio::task::JoinHandle;

/// A handle callers clone and push into; the actual `HashSet` lives on the
/// background task and is only ever touched from there.
#[derive(Clone)]
pub struct Cids {
    tx: Sender<Cid>,
}

/// Owns the background task and yields the deduplicated set once drained.
pub struct CidsHandle {
    set: Cids,
    task: JoinHandle<HashSet<Cid>>,
}

impl Cids {
    /// Spawns the background consumer and returns a handle plus the sender
    /// side to clone for producers.
    pub fn spawn() -> CidsHandle {
        let (tx, rx) = flume::unbounded();
        let task = tokio::task::spawn(async move {
            let mut set = HashSet::new();
            while let Ok(cid) = rx.recv_async().await {
                set.insert(cid);
            }
            set
        });
        CidsHandle {
            set: Cids { tx },
            task,
        }
    }

    /// Records `cid`. Never blocks; the channel is unbounded.
    pub fn record(&self, cid: Cid) {
        // The background task only stops when every sender is dropped, so
        // this can only fail during shutdown, at which point there is
        // nothing left to record into.
        let _ = self.tx.send(cid);
    }
}

impl CidsHandle {
    pub fn sender(&self) -> Cids {
        self.set.clone()
    }

    /// Drops the last sender this handle owns and awaits the drained set.
    /// Callers must have dropped every [`Cids`] clone obtained via
    /// [`CidsHandle::sender`] first, or this hangs waiting for the channel
    /// to close.
    pub async fn close(self) -> HashSet<Cid> {
        drop(self.set);
        self.task.await.unwrap_or_default()
    }
}

/// Returns the union of `write` with `read`, minus any key already present
/// in `write` — the original's "writes dominate reads" merge rule, applied
/// as pure data rather than requiring a shared mutex.
pub fn merge(reads: &HashSet<Cid>, writes: &HashSet<Cid>) -> HashSet<Cid> {
    let mut merged = writes.clone();
    merged.extend(reads.iter().filter(|cid| !writes.contains(*cid)).copied());
    merged
}
