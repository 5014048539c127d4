//! Snapshot Tests
//!
//! Tests for the mapping snapshot file format.

use std::collections::BTreeMap;
use std::fs;

use filevault::storage::snapshot::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use filevault::storage::{MappingTable, Snapshot};
use filevault::VaultError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_entries() -> BTreeMap<i32, String> {
    let mut entries = BTreeMap::new();
    entries.insert(1, "notes.txt".to_string());
    entries.insert(4, "photo.png".to_string());
    entries.insert(9, "résumé.pdf".to_string());
    entries
}

// =============================================================================
// Encode/Decode Tests
// =============================================================================

#[test]
fn test_encode_decode() {
    let snapshot = Snapshot::new(10, sample_entries());

    let decoded = Snapshot::decode(&snapshot.encode().unwrap()).unwrap();

    assert_eq!(decoded, snapshot);
    assert_eq!(decoded.version, SNAPSHOT_VERSION);
}

#[test]
fn test_encoded_prefix() {
    let bytes = Snapshot::default().encode().unwrap();

    assert_eq!(&bytes[..4], SNAPSHOT_MAGIC);
    let stored = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    assert_eq!(stored, crc32fast::hash(&bytes[8..]));
}

#[test]
fn test_default_is_empty() {
    let snapshot = Snapshot::default();
    assert_eq!(snapshot.next_id, 1);
    assert!(snapshot.entries.is_empty());
}

#[test]
fn test_decode_truncated() {
    let bytes = Snapshot::new(2, sample_entries()).encode().unwrap();

    assert!(matches!(
        Snapshot::decode(&bytes[..5]),
        Err(VaultError::Serialization(_))
    ));
    assert!(matches!(
        Snapshot::decode(&bytes[..bytes.len() - 3]),
        Err(VaultError::Serialization(_))
    ));
}

#[test]
fn test_decode_bad_magic() {
    let mut bytes = Snapshot::default().encode().unwrap();
    bytes[0] = b'X';

    assert!(matches!(
        Snapshot::decode(&bytes),
        Err(VaultError::Serialization(_))
    ));
}

#[test]
fn test_decode_detects_corruption() {
    let mut bytes = Snapshot::new(3, sample_entries()).encode().unwrap();
    let middle = 8 + (bytes.len() - 8) / 2;
    bytes[middle] ^= 0x55;

    assert!(matches!(
        Snapshot::decode(&bytes),
        Err(VaultError::Serialization(_))
    ));
}

#[test]
fn test_decode_rejects_future_version() {
    let mut snapshot = Snapshot::new(1, BTreeMap::new());
    snapshot.version = SNAPSHOT_VERSION + 1;

    let bytes = snapshot.encode().unwrap();

    assert!(matches!(
        Snapshot::decode(&bytes),
        Err(VaultError::Serialization(_))
    ));
}

// =============================================================================
// File Tests
// =============================================================================

#[test]
fn test_load_missing_file() {
    let temp = TempDir::new().unwrap();
    let loaded = Snapshot::load(&temp.path().join("absent.snapshot")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn test_load_empty_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.snapshot");
    fs::write(&path, b"").unwrap();

    assert!(Snapshot::load(&path).unwrap().is_none());
}

#[test]
fn test_persist_then_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mappings.snapshot");
    let staging = temp.path().join("mappings.snapshot.tmp");

    let snapshot = Snapshot::new(5, sample_entries());
    snapshot.persist(&path, &staging).unwrap();

    assert!(!staging.exists());
    assert_eq!(Snapshot::load(&path).unwrap(), Some(snapshot));
}

#[test]
fn test_persist_replaces_previous() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mappings.snapshot");
    let staging = temp.path().join("mappings.snapshot.tmp");

    Snapshot::new(5, sample_entries()).persist(&path, &staging).unwrap();
    Snapshot::new(6, BTreeMap::new()).persist(&path, &staging).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.next_id, 6);
    assert!(loaded.entries.is_empty());
}

// =============================================================================
// Mapping Table Tests
// =============================================================================

#[test]
fn test_mapping_rejects_either_side_taken() {
    let table = MappingTable::new();
    table.insert(1, "a.txt".to_string()).unwrap();

    assert!(matches!(
        table.insert(1, "b.txt".to_string()),
        Err(VaultError::Storage(_))
    ));
    assert!(matches!(
        table.insert(2, "a.txt".to_string()),
        Err(VaultError::Storage(_))
    ));
    assert_eq!(table.len(), 1);
    assert!(table.is_bijective());
}

#[test]
fn test_mapping_remove_frees_both_keys() {
    let table = MappingTable::new();
    table.insert(1, "a.txt".to_string()).unwrap();

    assert_eq!(table.remove_by_id(1).as_deref(), Some("a.txt"));
    assert_eq!(table.remove_by_id(1), None);
    assert_eq!(table.id_of("a.txt"), None);

    table.insert(2, "a.txt".to_string()).unwrap();
    assert_eq!(table.name_of(2).as_deref(), Some("a.txt"));
}
