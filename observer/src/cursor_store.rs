// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Durable per-chain scan cursor.
//!
//! One directory per chain under the store root; the cursor lives under the
//! single key `PosKey` as an unsigned LEB128 varint. Absence of the key is
//! distinct from a stored zero.

use crate::error::{ObserverError, ObserverResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Key of the last-scanned block height.
pub const POS_KEY: &str = "PosKey";

/// Maximum encoded length of a u64 varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` as an unsigned varint: little-endian 7-bit groups, high
/// bit set on every byte except the last.
pub fn encode_uvarint(mut value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            buf.push(byte | 0x80);
        } else {
            buf.push(byte);
            return buf;
        }
    }
}

/// Decode an unsigned varint from the start of `buf`. Trailing bytes after
/// the terminating group are rejected: the store holds exactly one value
/// per key.
pub fn decode_uvarint(buf: &[u8]) -> ObserverResult<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(ObserverError::StorageError(
                "varint longer than 10 bytes".to_string(),
            ));
        }
        if byte & 0x80 == 0 {
            // The 10th byte carries at most one significant bit.
            if i == MAX_VARINT_LEN - 1 && *byte > 1 {
                return Err(ObserverError::StorageError(
                    "varint overflows u64".to_string(),
                ));
            }
            if i + 1 != buf.len() {
                return Err(ObserverError::StorageError(format!(
                    "{} trailing bytes after varint",
                    buf.len() - i - 1
                )));
            }
            return Ok(value | (u64::from(*byte) << shift));
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Err(ObserverError::StorageError(
        "truncated varint".to_string(),
    ))
}

/// Durable map `chain -> last-scanned height`, file-backed.
///
/// A successful `store` is durable before it returns. One handle per chain;
/// the owning observer serializes access, cross-process sharing is not
/// supported.
#[derive(Debug)]
pub struct CursorStore {
    dir: PathBuf,
}

impl CursorStore {
    /// Open (creating if needed) the store directory `<root>/<chain_name>`.
    pub fn open(root: &Path, chain_name: &str) -> ObserverResult<Self> {
        let dir = root.join(chain_name);
        fs::create_dir_all(&dir).map_err(|e| {
            ObserverError::StorageError(format!("create store dir {:?}: {}", dir, e))
        })?;
        Ok(Self { dir })
    }

    fn key_path(&self) -> PathBuf {
        self.dir.join(POS_KEY)
    }

    /// Last durably stored height, or `None` if never stored.
    pub fn load(&self) -> ObserverResult<Option<u64>> {
        let path = self.key_path();
        let buf = match fs::read(&path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ObserverError::StorageError(format!(
                    "read {:?}: {}",
                    path, e
                )))
            }
        };
        decode_uvarint(&buf).map(Some)
    }

    /// Durably store `height`: written to a temp file, fsynced, renamed
    /// over the key.
    pub fn store(&self, height: u64) -> ObserverResult<()> {
        let tmp = self.dir.join(format!("{}.tmp", POS_KEY));
        let encoded = encode_uvarint(height);
        let write = |path: &Path| -> std::io::Result<()> {
            let mut file = File::create(path)?;
            file.write_all(&encoded)?;
            file.sync_all()
        };
        write(&tmp)
            .map_err(|e| ObserverError::StorageError(format!("write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, self.key_path())
            .map_err(|e| ObserverError::StorageError(format!("rename {:?}: {}", tmp, e)))?;
        Ok(())
    }

    /// Remove the stored cursor. Only used by explicit resets.
    pub fn reset(&self) -> ObserverResult<()> {
        match fs::remove_file(self.key_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ObserverError::StorageError(format!("reset: {}", e))),
        }
    }

    /// Every `store` is already durable, so closing only logs. Kept as an
    /// explicit lifecycle step so the stop path mirrors the open path.
    pub fn close(&self) {
        info!("cursor store at {:?} closed", self.dir);
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_round_trip_boundaries() {
        let cases = [
            0u64,
            1,
            127,
            128,
            129,
            16383,
            16384,
            300,
            988,
            u32::MAX as u64,
            u64::MAX - 1,
            u64::MAX,
        ];
        for value in cases {
            let encoded = encode_uvarint(value);
            assert!(encoded.len() <= MAX_VARINT_LEN);
            assert_eq!(decode_uvarint(&encoded).unwrap(), value, "value {}", value);
        }
        // every 7-bit group boundary
        for shift in 0..64 {
            let value = 1u64 << shift;
            assert_eq!(decode_uvarint(&encode_uvarint(value)).unwrap(), value);
            assert_eq!(
                decode_uvarint(&encode_uvarint(value - 1)).unwrap(),
                value - 1
            );
        }
    }

    #[test]
    fn test_varint_known_encodings() {
        // matches Go's binary.PutUvarint
        assert_eq!(encode_uvarint(0), vec![0x00]);
        assert_eq!(encode_uvarint(1), vec![0x01]);
        assert_eq!(encode_uvarint(127), vec![0x7f]);
        assert_eq!(encode_uvarint(128), vec![0x80, 0x01]);
        assert_eq!(encode_uvarint(300), vec![0xac, 0x02]);
        assert_eq!(encode_uvarint(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_varint_rejects_malformed() {
        // truncated: continuation bit set on the last byte
        assert!(decode_uvarint(&[0x80]).is_err());
        assert!(decode_uvarint(&[]).is_err());
        // trailing garbage
        assert!(decode_uvarint(&[0x01, 0x00]).is_err());
        // 11 continuation groups
        assert!(decode_uvarint(&[0x80; 11]).is_err());
        // 10th byte with more than one significant bit overflows u64
        let mut buf = vec![0xffu8; 9];
        buf.push(0x02);
        assert!(decode_uvarint(&buf).is_err());
    }

    #[test]
    fn test_store_load_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let store = CursorStore::open(root.path(), "Eth").unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.store(988).unwrap();
        assert_eq!(store.load().unwrap(), Some(988));

        // a stored zero is distinct from absence
        store.store(0).unwrap();
        assert_eq!(store.load().unwrap(), Some(0));

        // the on-disk bytes are the raw varint
        let raw = std::fs::read(root.path().join("Eth").join(POS_KEY)).unwrap();
        assert_eq!(raw, encode_uvarint(0));
    }

    #[test]
    fn test_store_survives_reopen() {
        let root = tempfile::tempdir().unwrap();
        {
            let store = CursorStore::open(root.path(), "Bsc").unwrap();
            store.store(123456).unwrap();
            store.close();
        }
        let store = CursorStore::open(root.path(), "Bsc").unwrap();
        assert_eq!(store.load().unwrap(), Some(123456));
    }

    #[test]
    fn test_chains_are_partitioned() {
        let root = tempfile::tempdir().unwrap();
        let eth = CursorStore::open(root.path(), "Eth").unwrap();
        let bsc = CursorStore::open(root.path(), "Bsc").unwrap();
        eth.store(10).unwrap();
        bsc.store(20).unwrap();
        assert_eq!(eth.load().unwrap(), Some(10));
        assert_eq!(bsc.load().unwrap(), Some(20));
    }

    #[test]
    fn test_reset_removes_key() {
        let root = tempfile::tempdir().unwrap();
        let store = CursorStore::open(root.path(), "Eth").unwrap();
        store.store(42).unwrap();
        store.reset().unwrap();
        assert_eq!(store.load().unwrap(), None);
        // resetting an absent key is fine
        store.reset().unwrap();
    }
}
