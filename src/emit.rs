// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Writes the traced set of accessed blocks out as a single CAR file:
//! writes dominate reads, and the store consulted for each block's bytes is
//! whatever `Blockstore` the caller already has wired up (the full, stacked
//! overlay).

use std::collections::HashSet;
use std::path::Path;

use cid::Cid;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::blockstore::Blockstore;
use crate::car::{self, CarHeader};
use crate::error::{BlockstoreError, CarError};

/// Computes the final emitted set: every write, plus every read that isn't
/// also a write.
pub fn merged_keys(reads: &HashSet<Cid>, writes: &HashSet<Cid>) -> HashSet<Cid> {
    crate::dedup::merge(reads, writes)
}

/// Writes a CAR file at `path` containing `roots` plus the block data for
/// every key in `keys`, read back out of `store`.
pub async fn emit(
    path: impl AsRef<Path>,
    roots: Vec<Cid>,
    keys: &HashSet<Cid>,
    store: &(dyn Blockstore + Send + Sync),
) -> Result<(), BlockstoreError> {
    let file = File::create(path).await.map_err(CarError::Io)?;
    let mut writer = BufWriter::new(file);

    let header = CarHeader::new(roots);
    let header_frame = header.to_frame().map_err(BlockstoreError::Car)?;
    writer.write_all(&header_frame).await.map_err(CarError::Io)?;

    for cid in keys {
        let data = store.get(cid)?.ok_or(BlockstoreError::NotFound)?;
        let mut frame = Vec::new();
        car::write_record(&mut frame, cid, &data);
        writer.write_all(&frame).await.map_err(CarError::Io)?;
    }

    writer.flush().await.map_err(CarError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::MutableStore;
    use cid::multihash::Multihash;

    fn test_cid(tag: u8) -> Cid {
        let digest = [tag; 32];
        let mh = Multihash::wrap(0x12, &digest).unwrap();
        Cid::new_v1(0x55, mh)
    }

    #[test]
    fn writes_dominate_reads_in_merge() {
        let read_only = test_cid(1);
        let both = test_cid(2);
        let write_only = test_cid(3);

        let reads: HashSet<Cid> = [read_only, both].into_iter().collect();
        let writes: HashSet<Cid> = [both, write_only].into_iter().collect();

        let merged = merged_keys(&reads, &writes);
        assert_eq!(
            merged,
            [read_only, both, write_only].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn emits_a_readable_car_file() {
        let store = MutableStore::new();
        let a = test_cid(1);
        let b = test_cid(2);
        store.put(&a, b"block-a").unwrap();
        store.put(&b, b"block-b").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.car");
        let keys: HashSet<Cid> = [a, b].into_iter().collect();

        emit(&path, vec![a], &keys, &store).await.unwrap();

        let bytes = tokio::fs::read(&path).await.unwrap();
        let (header, consumed) = CarHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.roots, vec![a]);

        let mut offset = consumed;
        let mut seen = HashSet::new();
        while offset < bytes.len() {
            let record = car::read_record(&bytes[offset..]).unwrap();
            seen.insert(record.cid);
            offset += record.frame_len;
        }
        assert_eq!(seen, keys);
    }
}
