//! Mapping Snapshot
//!
//! Durable copy of the id → name table.
//!
//! ## File Format
//! ```text
//! ┌────────────┬────────────────┬──────────────────────────────┐
//! │ Magic (4)  │ CRC32 (4, LE)  │ bincode(Snapshot)            │
//! └────────────┴────────────────┴──────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

use super::atomic::write_atomically;

/// Magic bytes at the start of a snapshot file
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"FVMS";

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

const PREFIX_SIZE: usize = 8;

/// Persisted form of the mapping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,

    /// Next id to hand out; kept so freed ids stay retired across restarts
    pub next_id: i32,

    pub entries: BTreeMap<i32, String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    pub fn new(next_id: i32, entries: BTreeMap<i32, String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_id,
            entries,
        }
    }

    /// Serialize with magic and checksum
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)
            .map_err(|e| VaultError::Serialization(format!("snapshot encode: {}", e)))?;

        let mut bytes = Vec::with_capacity(PREFIX_SIZE + body.len());
        bytes.extend_from_slice(SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Parse and verify a snapshot file's contents
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PREFIX_SIZE {
            return Err(VaultError::Serialization(format!(
                "snapshot truncated: {} bytes",
                bytes.len()
            )));
        }

        let (prefix, body) = bytes.split_at(PREFIX_SIZE);
        if &prefix[..4] != SNAPSHOT_MAGIC {
            return Err(VaultError::Serialization("snapshot magic mismatch".into()));
        }

        let stored_crc = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
        let computed_crc = crc32fast::hash(body);
        if stored_crc != computed_crc {
            return Err(VaultError::Serialization(format!(
                "snapshot checksum mismatch: stored {:08x}, computed {:08x}",
                stored_crc, computed_crc
            )));
        }

        let snapshot: Snapshot = bincode::deserialize(body)
            .map_err(|e| VaultError::Serialization(format!("snapshot decode: {}", e)))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(VaultError::Serialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        Ok(snapshot)
    }

    /// Read the snapshot at `path`; `None` if there is none yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read(path) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Self::decode(&bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replace the snapshot at `path`, staging through `temp`
    pub fn persist(&self, path: &Path, temp: &Path) -> Result<()> {
        let bytes = self.encode()?;
        write_atomically(temp, path, &bytes).map_err(|e| {
            VaultError::Storage(format!(
                "could not write snapshot {}: {}",
                path.display(),
                e
            ))
        })
    }
}
