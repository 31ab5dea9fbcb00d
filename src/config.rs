// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! CLI configuration: CAR stack positional arguments plus the three
//! environment-bound switches the original read directly off `os.Getenv`.

use std::path::PathBuf;

use cid::Cid;
use clap::Parser;

/// Layers a CAR-file overlay stack on top of a mutable backing store,
/// optionally tracing every block read or written through it.
#[derive(Debug, Parser)]
#[command(name = "car-overlay-store", version, about)]
pub struct Args {
    /// CAR files to stack, innermost-first. Each `<path>.car` is expected to
    /// have a companion index at `<path>.cids`.
    #[arg(required = true)]
    pub cars: Vec<PathBuf>,

    /// CID of the tipset key to interpret.
    #[arg(long, env = "CTS")]
    pub cts: String,

    /// Destination CAR file for a traced run's accessed-block set. Absence
    /// disables tracing entirely.
    #[arg(long, env = "HOOK")]
    pub hook: Option<PathBuf>,

    /// Destination file for structured trace logging. Absence logs to
    /// stderr.
    #[arg(long, env = "DVM_LOG")]
    pub dvm_log: Option<PathBuf>,
}

/// One resolved CAR layer: the data file and its companion index file.
#[derive(Debug, Clone)]
pub struct CarLayer {
    pub car_path: PathBuf,
    pub index_path: PathBuf,
}

impl Args {
    /// Resolves each `<path>.car` to `(car_path, <path>.cids)`, in the same
    /// innermost-first order the stack should be built in.
    pub fn layers(&self) -> Vec<CarLayer> {
        self.cars
            .iter()
            .map(|car_path| CarLayer {
                car_path: car_path.clone(),
                index_path: car_path.with_extension("cids"),
            })
            .collect()
    }

    /// Parses `CTS` into the tipset CID it names. Kept as a plain `String`
    /// on [`Args`] (rather than a `Cid`-typed clap field) so a malformed
    /// value surfaces through the same `anyhow` error path as every other
    /// runtime failure in the CLI binary, instead of a `clap` usage error.
    pub fn tipset_cid(&self) -> anyhow::Result<Cid> {
        Cid::try_from(self.cts.as_str())
            .map_err(|e| anyhow::anyhow!("invalid CTS tipset CID {:?}: {e}", self.cts))
    }
}
