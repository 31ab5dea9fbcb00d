// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Error types for every component, plus a crate-level aggregate.

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::index::MemoryIndex`].
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid index file: length {len} is not >= 80 and a multiple of 40")]
    InvalidLength { len: usize },
    #[error("io error reading index file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing a framed CAR record.
#[derive(Debug, Error)]
pub enum CarError {
    #[error("failed to decode record length varint")]
    Varint,
    #[error("declared record length {declared} exceeds {available} bytes read")]
    DeclaredLengthOverrun { declared: usize, available: usize },
    #[error("record shorter than CID prefix + key ({actual} < {expected})")]
    TooShortForKey { actual: usize, expected: usize },
    #[error("CID prefix mismatch at offset")]
    PrefixMismatch,
    #[error("CID key mismatch at offset")]
    KeyMismatch,
    #[error("io error reading CAR file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cbor encoding error: {0}")]
    Cbor(String),
}

/// Errors raised by [`crate::blockstore::Blockstore`] implementations.
#[derive(Debug, Error)]
pub enum BlockstoreError {
    #[error("block not found")]
    NotFound,
    #[error("operation not supported by this blockstore layer")]
    Unsupported,
    #[error(transparent)]
    Car(#[from] CarError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlockstoreError {
    /// True for the recoverable "keep looking in the next layer" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlockstoreError::NotFound)
    }
}

/// Crate-level error aggregate, for call sites (e.g. the CLI binary) that
/// want a single error type rather than threading each component's error
/// through separately.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Car(#[from] CarError),
    #[error(transparent)]
    Blockstore(#[from] BlockstoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
