//! File Store
//!
//! Owns the stored files, the id ↔ name table and its snapshot.
//!
//! ## Responsibilities
//! - Turn client names into safe, unique stored names
//! - Issue ids from a counter that only moves forward
//! - Commit file contents atomically (temp file + rename)
//! - Keep the snapshot in step with every successful mutation

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rand::Rng;

use crate::config::Config;
use crate::error::{Result, VaultError};

use super::atomic::write_atomically;
use super::mapping::MappingTable;
use super::naming::{self, NamePolicy};
use super::snapshot::Snapshot;

/// Give up disambiguating a name after this many random draws
const MAX_SUFFIX_ATTEMPTS: usize = 10_000;

/// State behind the decision lock: the id counter and names claimed by Puts
/// that have not registered yet
#[derive(Debug)]
struct Allocator {
    next_id: i32,
    in_flight: HashSet<String>,
}

/// A name and id claimed by one Put; the name is released on drop
struct Reservation<'a> {
    allocator: &'a Mutex<Allocator>,
    id: i32,
    name: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.allocator.lock().in_flight.remove(&self.name);
    }
}

/// Manages stored files
///
/// ## Concurrency:
/// - `allocator`: the only lock Puts contend on; held just long enough to
///   pick a free name and the next id, or to free a name and its file
/// - Never call `persist` while holding `allocator`
/// - `mapping`: RwLock inside, point lookups share the read side
/// - `persist_lock`: serializes snapshot rewrites
/// - All methods use `&self`; share the store with `Arc`
pub struct FileStore {
    /// Directory holding the stored files
    root: PathBuf,

    /// Staging directory for uploads in progress
    temp_dir: PathBuf,

    /// Where the mapping snapshot lives
    snapshot_path: PathBuf,

    policy: NamePolicy,

    mapping: MappingTable,

    allocator: Mutex<Allocator>,

    persist_lock: Mutex<()>,
}

impl FileStore {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    /// Starts with a dot, so no client name can collide with it
    pub const META_DIR: &'static str = ".filevault";
    const TEMP_DIR: &'static str = "tmp";
    const SNAPSHOT_FILENAME: &'static str = "mappings.snapshot";

    /// Open or create a store rooted at `root`
    ///
    /// On startup:
    /// 1. Create the root, metadata and temp directories
    /// 2. Remove temp files left behind by a crash
    /// 3. Load the snapshot, dropping entries whose file is gone
    pub fn open(root: &Path, policy: NamePolicy) -> Result<Self> {
        let meta_dir = root.join(Self::META_DIR);
        let temp_dir = meta_dir.join(Self::TEMP_DIR);
        let snapshot_path = meta_dir.join(Self::SNAPSHOT_FILENAME);

        fs::create_dir_all(root)?;
        fs::create_dir_all(&temp_dir)?;

        Self::clear_temp_dir(&temp_dir)?;

        let snapshot = Snapshot::load(&snapshot_path)?.unwrap_or_default();
        let mapping = MappingTable::new();
        let mut next_id = snapshot.next_id.max(1);
        let mut pruned = 0usize;

        for (id, name) in snapshot.entries {
            if id < 1 || name.is_empty() || naming::sanitize(&name) != name {
                return Err(VaultError::Serialization(format!(
                    "snapshot holds an invalid entry: {} → {:?}",
                    id, name
                )));
            }

            next_id = next_id.max(id.saturating_add(1));

            if !root.join(&name).is_file() {
                tracing::warn!("Dropping mapping {} → {:?}: file is missing", id, name);
                pruned += 1;
                continue;
            }

            mapping.insert(id, name).map_err(|e| {
                VaultError::Serialization(format!("snapshot is not one-to-one: {}", e))
            })?;
        }

        let store = Self {
            root: root.to_path_buf(),
            temp_dir,
            snapshot_path,
            policy,
            mapping,
            allocator: Mutex::new(Allocator {
                next_id,
                in_flight: HashSet::new(),
            }),
            persist_lock: Mutex::new(()),
        };

        if pruned > 0 {
            store.persist()?;
        }

        tracing::info!(
            files = store.mapping.len(),
            next_id,
            "File store opened at {}",
            store.root.display()
        );

        Ok(store)
    }

    /// Open the store described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(
            &config.storage_dir,
            NamePolicy::new(&config.allowed_extensions),
        )
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Store `data` under (a sanitized, possibly disambiguated form of)
    /// `filename` and return its new id
    ///
    /// Returns:
    /// - `Ok(id)`: committed, mapped and persisted
    /// - `Err(Validation)`: name rejected by the policy
    /// - `Err(Storage)`: disk failure; nothing was left behind
    pub fn put(&self, filename: &str, data: &[u8]) -> Result<i32> {
        let requested = self.policy.resolve(filename).map_err(|e| {
            tracing::warn!("Rejected upload {:?}: {}", filename, e);
            e
        })?;

        let reservation = self.reserve(requested)?;
        let id = reservation.id;
        let name = reservation.name.clone();
        let path = self.root.join(&name);
        let temp = self.temp_dir.join(format!("put-{}.part", id));

        if let Err(e) = write_atomically(&temp, &path, data) {
            tracing::error!("Failed to store {:?} (id {}): {}", name, id, e);
            return Err(VaultError::Storage(format!(
                "could not store {:?}: {}",
                name, e
            )));
        }

        if let Err(e) = self.mapping.insert(id, name.clone()) {
            self.remove_quietly(&path);
            return Err(e);
        }
        drop(reservation);

        // Undo the commit if the snapshot cannot follow, so the table on disk
        // never disagrees with the files that exist.
        if let Err(e) = self.persist() {
            tracing::error!("Rolling back {:?} (id {}): {}", name, id, e);
            let _allocator = self.allocator.lock();
            self.mapping.remove_by_id(id);
            self.remove_quietly(&path);
            return Err(e);
        }

        tracing::info!(id, bytes = data.len(), "Stored {:?}", name);
        Ok(id)
    }

    /// Read the file with the given id
    pub fn get_by_id(&self, id: i32) -> Result<Vec<u8>> {
        let name = self
            .mapping
            .name_of(id)
            .ok_or_else(|| VaultError::NotFound(format!("id {}", id)))?;
        self.read_file(&name)
    }

    /// Read the file with the given name
    pub fn get_by_name(&self, filename: &str) -> Result<Vec<u8>> {
        let name = naming::sanitize(filename);
        if !self.mapping.contains_name(&name) {
            return Err(VaultError::NotFound(format!("{:?}", filename)));
        }
        self.read_file(&name)
    }

    /// Delete the file with the given id
    ///
    /// Returns:
    /// - `Ok(true)`: file removed and unmapped
    /// - `Ok(false)`: no such id (or a concurrent delete got there first)
    /// - `Err(Storage)`: the file could not be removed; mapping unchanged
    pub fn delete_by_id(&self, id: i32) -> Result<bool> {
        let Some(name) = self.unmap_and_unlink(id)? else {
            return Ok(false);
        };

        self.persist()?;

        tracing::info!(id, "Deleted {:?}", name);
        Ok(true)
    }

    /// Delete the file with the given name
    pub fn delete_by_name(&self, filename: &str) -> Result<bool> {
        match self.mapping.id_of(&naming::sanitize(filename)) {
            Some(id) => self.delete_by_id(id),
            None => Ok(false),
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Stored name for an id
    pub fn filename_of(&self, id: i32) -> Option<String> {
        self.mapping.name_of(id)
    }

    /// Id for a stored name
    pub fn id_of(&self, filename: &str) -> Option<i32> {
        self.mapping.id_of(&naming::sanitize(filename))
    }

    /// The live mapping table
    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// The id the next successful Put will receive
    pub fn next_id(&self) -> i32 {
        self.allocator.lock().next_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The decision section: pick a free name and the next id
    fn reserve(&self, requested: String) -> Result<Reservation<'_>> {
        let mut allocator = self.allocator.lock();

        let mut name = requested;
        if self.is_taken(&allocator.in_flight, &name) {
            let original = name;
            let mut rng = rand::thread_rng();
            let mut attempts = 0;

            name = loop {
                attempts += 1;
                if attempts > MAX_SUFFIX_ATTEMPTS {
                    return Err(VaultError::Storage(format!(
                        "no free name derived from {:?}",
                        original
                    )));
                }

                let candidate =
                    naming::with_suffix(&original, rng.gen_range(0..naming::SUFFIX_RANGE));
                if !self.is_taken(&allocator.in_flight, &candidate) {
                    break candidate;
                }
            };

            tracing::debug!("Name {:?} taken, using {:?}", original, name);
        }

        let id = allocator.next_id;
        allocator.next_id = id
            .checked_add(1)
            .ok_or_else(|| VaultError::Storage("file id space exhausted".into()))?;
        allocator.in_flight.insert(name.clone());

        Ok(Reservation {
            allocator: &self.allocator,
            id,
            name,
        })
    }

    fn is_taken(&self, in_flight: &HashSet<String>, name: &str) -> bool {
        in_flight.contains(name) || self.mapping.contains_name(name)
    }

    /// Take `id` out of the table and remove its file
    ///
    /// Runs under the allocator lock: a freed name cannot be handed to a Put
    /// until its old file is gone. Only the caller that takes the entry
    /// touches the file. The entry is restored if the file stays.
    fn unmap_and_unlink(&self, id: i32) -> Result<Option<String>> {
        let _allocator = self.allocator.lock();

        let Some(name) = self.mapping.remove_by_id(id) else {
            return Ok(None);
        };

        match fs::remove_file(self.root.join(&name)) {
            Ok(()) => Ok(Some(name)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("File for id {} was already gone: {:?}", id, name);
                Ok(Some(name))
            }
            Err(e) => {
                tracing::error!("Failed to delete {:?} (id {}): {}", name, id, e);
                let message = format!("could not delete {:?}: {}", name, e);
                self.mapping.insert(id, name)?;
                Err(VaultError::Storage(message))
            }
        }
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        match fs::read(self.root.join(name)) {
            Ok(data) => Ok(data),
            // Deleted between the lookup and the read
            Err(e) if e.kind() == io::ErrorKind::NotFound && !self.mapping.contains_name(name) => {
                Err(VaultError::NotFound(format!("{:?}", name)))
            }
            Err(e) => {
                tracing::error!("Failed to read {:?}: {}", name, e);
                Err(VaultError::Storage(format!("could not read {:?}: {}", name, e)))
            }
        }
    }

    /// Rewrite the snapshot from the current table
    fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock();
        let entries = self.mapping.entries();
        let next_id = self.allocator.lock().next_id;

        Snapshot::new(next_id, entries).persist(
            &self.snapshot_path,
            &self.snapshot_path.with_extension("snapshot.tmp"),
        )?;

        tracing::debug!("Snapshot written to {}", self.snapshot_path.display());
        Ok(())
    }

    fn remove_quietly(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }

    fn clear_temp_dir(temp_dir: &Path) -> Result<()> {
        for entry in fs::read_dir(temp_dir)? {
            let path = entry?.path();
            if path.is_file() {
                tracing::warn!("Removing stale temp file {}", path.display());
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
