// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! CAR (Content Addressable aRchive) framing: the header, and the
//! `varint(len) || cid-bytes || block-bytes` record shape used throughout
//! the overlay and the tracing hook.

use bytes::Bytes;
use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::error::CarError;

/// An owned, fully in-memory CAR file readable at arbitrary positions.
/// Loading a whole CAR into memory is the simplest correct option for a
/// layer that is itself just a cache in front of a backing store; a
/// memory-mapped or positional-file variant can implement
/// [`positioned_io::ReadAt`] the same way without changing any caller. Backed
/// by [`Bytes`] rather than `Vec<u8>` so a stacked layer can clone its handle
/// to the underlying CAR file cheaply instead of copying it.
pub struct OwnedCarBytes(Bytes);

impl OwnedCarBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl positioned_io::ReadAt for OwnedCarBytes {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let pos = pos as usize;
        if pos >= self.0.len() {
            return Ok(0);
        }
        let available = &self.0[pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}

/// The single CBOR object at the start of a CARv1 file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarHeader {
    pub roots: Vec<Cid>,
    pub version: u64,
}

impl CarHeader {
    pub fn new(roots: Vec<Cid>) -> Self {
        Self { roots, version: 1 }
    }

    /// Encodes the header as a length-prefixed CBOR frame.
    pub fn to_frame(&self) -> Result<Vec<u8>, CarError> {
        let body = serde_ipld_dagcbor::to_vec(self).map_err(|e| CarError::Cbor(e.to_string()))?;
        let mut out = Vec::with_capacity(10 + body.len());
        write_uvarint(&mut out, body.len() as u64);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decodes a header from the start of `buf`, returning the header and
    /// the number of bytes consumed.
    pub fn from_bytes(buf: &[u8]) -> Result<(Self, usize), CarError> {
        let (len, varint_len) = read_uvarint(buf)?;
        let len = len as usize;
        let body_end = varint_len
            .checked_add(len)
            .ok_or(CarError::DeclaredLengthOverrun {
                declared: len,
                available: buf.len(),
            })?;
        if body_end > buf.len() {
            return Err(CarError::DeclaredLengthOverrun {
                declared: len,
                available: buf.len() - varint_len,
            });
        }
        let header = serde_ipld_dagcbor::from_slice(&buf[varint_len..body_end])
            .map_err(|e| CarError::Cbor(e.to_string()))?;
        Ok((header, body_end))
    }
}

/// A single decoded `(cid, block-bytes)` record, plus the total byte span
/// (including the varint and CID) it occupied in the source buffer.
#[derive(Debug, Clone)]
pub struct Record {
    pub cid: Cid,
    pub data_start: usize,
    pub data_end: usize,
    pub frame_len: usize,
}

impl Record {
    pub fn data<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.data_start..self.data_end]
    }
}

/// Parses one framed record starting at byte 0 of `buf`. `buf` need only
/// contain (at least) the full frame; trailing bytes are ignored.
pub fn read_record(buf: &[u8]) -> Result<Record, CarError> {
    let (len, varint_len) = read_uvarint(buf)?;
    let len = len as usize;
    let record_end = varint_len
        .checked_add(len)
        .ok_or(CarError::DeclaredLengthOverrun {
            declared: len,
            available: buf.len(),
        })?;
    if record_end > buf.len() {
        return Err(CarError::DeclaredLengthOverrun {
            declared: len,
            available: buf.len().saturating_sub(varint_len),
        });
    }
    let body = &buf[varint_len..record_end];
    let cid = Cid::read_bytes(body).map_err(|_| CarError::TooShortForKey {
        actual: body.len(),
        expected: 0,
    })?;
    let cid_len = cid.to_bytes().len();
    Ok(Record {
        cid,
        data_start: varint_len + cid_len,
        data_end: record_end,
        frame_len: record_end,
    })
}

/// Frames `cid || data` as a length-prefixed record, matching `util.LdWrite`
/// in the original implementation.
pub fn write_record(out: &mut Vec<u8>, cid: &Cid, data: &[u8]) {
    let cid_bytes = cid.to_bytes();
    let len = cid_bytes.len() + data.len();
    write_uvarint(out, len as u64);
    out.extend_from_slice(&cid_bytes);
    out.extend_from_slice(data);
}

fn write_uvarint(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0u8; 10];
    let encoded = unsigned_varint::encode::u64(value, &mut buf);
    out.extend_from_slice(encoded);
}

/// Decodes a uvarint from the start of `buf`, returning `(value, bytes_read)`.
pub fn read_uvarint(buf: &[u8]) -> Result<(u64, usize), CarError> {
    unsigned_varint::decode::u64(buf)
        .map(|(v, rest)| (v, buf.len() - rest.len()))
        .map_err(|_| CarError::Varint)
}
