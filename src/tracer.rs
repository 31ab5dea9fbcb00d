// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Ambient logging. The original kept a global mutable logger plus an
//! indent counter bumped and restored by hand around every traced call;
//! here a [`tracing::Span`] entered for the duration of a call gives the
//! same "nested, balanced indent" shape for free, and disappears entirely
//! when no subscriber is installed.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber.
///
/// With `log_path` set, writes newline-delimited events to that file via a
/// non-blocking appender (mirroring `DVM_LOG`'s original role as an
/// opt-in file sink); with `None`, logs to stderr. Returns the
/// [`tracing_appender::non_blocking::WorkerGuard`] that must be kept alive
/// for the duration of the process when a file sink is used.
pub fn init(log_path: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .unwrap_or_else(|e| panic!("failed to open trace log {}: {e}", path.display()));
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Interface boundary for the CBOR-structure pretty-printer the original
/// used to dump IPLD values while tracing VM execution. Deliberately left
/// as a trait with no built-in implementer: structural CBOR dumping is
/// outside this crate's scope, but a replay driver wired in downstream can
/// supply one without this crate needing to depend on a CBOR value
/// representation it otherwise has no use for.
pub trait CborDumper {
    fn dump(&self, label: &str, bytes: &[u8]);
}

/// A [`CborDumper`] that discards everything, used where no dumper is
/// configured.
pub struct NullDumper;

impl CborDumper for NullDumper {
    fn dump(&self, _label: &str, _bytes: &[u8]) {}
}
