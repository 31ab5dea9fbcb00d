// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Layered, read-through CAR blockstore with access tracing.
//!
//! A stack of fixed CAR files, each with a companion sorted index, sits in
//! front of a mutable backing store. Lookups probe the stack outermost
//! layer first and fall through to the backing store on a miss; an
//! optional tracing overlay records exactly which blocks a run touched so
//! that set can be re-emitted as a single, minimal CAR afterwards.

pub mod blockstore;
pub mod car;
pub mod config;
pub mod dedup;
pub mod emit;
pub mod error;
pub mod hook;
pub mod index;
pub mod key;
pub mod overlay;
pub mod replay;
pub mod tracer;

pub use blockstore::{Blockstore, MutableStore, View};
pub use error::Error;
