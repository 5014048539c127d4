//! Mapping Table
//!
//! In-memory bijection between file ids and stored names.
//!
//! ## Concurrency:
//! - Point lookups take the shared side of an `RwLock`
//! - Inserts and removals update both directions under one exclusive lock,
//!   so readers never observe half an entry

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::{Result, VaultError};

#[derive(Debug, Default)]
struct Bijection {
    by_id: HashMap<i32, String>,
    by_name: HashMap<String, i32>,
}

/// Thread-safe id ↔ name table
#[derive(Debug, Default)]
pub struct MappingTable {
    inner: RwLock<Bijection>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id ↔ name`; fails if either side is already mapped
    pub fn insert(&self, id: i32, name: String) -> Result<()> {
        let mut table = self.inner.write();

        if let Some(existing) = table.by_id.get(&id) {
            return Err(VaultError::Storage(format!(
                "id {} is already mapped to {:?}",
                id, existing
            )));
        }
        if let Some(existing) = table.by_name.get(&name) {
            return Err(VaultError::Storage(format!(
                "name {:?} is already mapped to id {}",
                name, existing
            )));
        }

        table.by_name.insert(name.clone(), id);
        table.by_id.insert(id, name);
        Ok(())
    }

    /// Remove the entry for `id`, returning its name
    pub fn remove_by_id(&self, id: i32) -> Option<String> {
        let mut table = self.inner.write();
        let name = table.by_id.remove(&id)?;
        table.by_name.remove(&name);
        Some(name)
    }

    pub fn name_of(&self, id: i32) -> Option<String> {
        self.inner.read().by_id.get(&id).cloned()
    }

    pub fn id_of(&self, name: &str) -> Option<i32> {
        self.inner.read().by_name.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the table ordered by id (snapshot form)
    pub fn entries(&self) -> BTreeMap<i32, String> {
        self.inner
            .read()
            .by_id
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect()
    }

    /// Both directions agree entry for entry
    pub fn is_bijective(&self) -> bool {
        let table = self.inner.read();
        table.by_id.len() == table.by_name.len()
            && table
                .by_id
                .iter()
                .all(|(id, name)| table.by_name.get(name) == Some(id))
    }
}
