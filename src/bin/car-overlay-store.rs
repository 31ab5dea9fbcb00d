// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Stacks a chain of CAR overlays in front of a mutable store, optionally
//! traces the replay, and prints a colored pass/fail line.

use std::sync::Arc;

use car_overlay::blockstore::{Blockstore, MutableStore};
use car_overlay::car::OwnedCarBytes;
use car_overlay::config::Args;
use car_overlay::dedup::Cids;
use car_overlay::emit;
use car_overlay::hook::HookIpld;
use car_overlay::index::MemoryIndex;
use car_overlay::overlay::CidsIpld;
use car_overlay::replay::{NullReplayer, Replayer};
use car_overlay::tracer;
use clap::Parser;
use colored::Colorize;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = tracer::init(args.dvm_log.as_deref());
    let tipset_cid = args.tipset_cid()?;

    let mut store: Arc<dyn Blockstore + Send + Sync> = Arc::new(MutableStore::new());
    for layer in args.layers() {
        let car_bytes = tokio::fs::read(&layer.car_path).await.map_err(|e| {
            anyhow::anyhow!("reading {}: {e}", layer.car_path.display())
        })?;
        let index_bytes = std::fs::read(&layer.index_path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", layer.index_path.display()))?;
        let index = MemoryIndex::new(index_bytes)?;
        store = Arc::new(CidsIpld::new(OwnedCarBytes::new(car_bytes), index, store));
    }

    let trace = match &args.hook {
        Some(dest) => {
            let reads = Cids::spawn();
            let writes = Cids::spawn();
            Some((dest.clone(), reads, writes))
        }
        None => None,
    };

    let replay_store: Arc<dyn Blockstore + Send + Sync> = match &trace {
        Some((_, reads, writes)) => Arc::new(HookIpld::new(
            store.clone(),
            reads.sender(),
            writes.sender(),
        )),
        None => store.clone(),
    };

    let replayer = NullReplayer;
    let outcome = replayer.replay(replay_store.as_ref(), &tipset_cid, 0);

    match &outcome {
        Ok(result) => {
            println!(
                "{} tipset {} at epoch {}",
                "ok".green().bold(),
                result.tipset_cid,
                result.epoch
            );
        }
        Err(err) => {
            println!("{} {err}", "fail".red().bold());
        }
    }

    if let Some((dest, reads, writes)) = trace {
        let reads_set = reads.close().await;
        let writes_set = writes.close().await;
        let merged = emit::merged_keys(&reads_set, &writes_set);
        emit::emit(&dest, vec![tipset_cid], &merged, store.as_ref()).await?;
    }

    outcome.map(|_| ())
}
