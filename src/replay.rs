// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The replay boundary: the chain state manager and VM that actually
//! interpret a tipset against a blockstore are out of scope for this crate.
//! [`Replayer`] is the seam a downstream binary plugs a real implementation
//! into; [`NullReplayer`] exists for tests and as the CLI's placeholder
//! default.

use cid::Cid;

use crate::blockstore::Blockstore;

/// Outcome of replaying one tipset against a blockstore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub tipset_cid: Cid,
    pub epoch: u64,
    pub receipts_root: Cid,
}

/// Something that can interpret a tipset at a given epoch against a
/// blockstore and produce a resulting state root and receipts root. A real
/// implementation wraps a chain state manager and VM; this crate only
/// needs the boundary so the CLI can wire the overlay stack up to *some*
/// replay driver without owning VM semantics itself.
pub trait Replayer {
    fn replay(
        &self,
        store: &(dyn Blockstore + Send + Sync),
        tipset_cid: &Cid,
        epoch: u64,
    ) -> anyhow::Result<ReplayOutcome>;
}

/// A [`Replayer`] that always fails, used where no real state manager is
/// wired in. Exercises the CLI's error-reporting path end to end without
/// requiring a VM.
pub struct NullReplayer;

impl Replayer for NullReplayer {
    fn replay(
        &self,
        _store: &(dyn Blockstore + Send + Sync),
        tipset_cid: &Cid,
        _epoch: u64,
    ) -> anyhow::Result<ReplayOutcome> {
        anyhow::bail!("no replay driver configured for tipset {tipset_cid}")
    }
}
