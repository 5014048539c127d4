//! Storage Module
//!
//! Stored files plus the durable id ↔ name index.
//!
//! ## Responsibilities
//! - Sanitize and validate client-supplied names
//! - Assign unique, never-reused ids
//! - Commit contents atomically (temp file + rename)
//! - Mirror the mapping in a snapshot after every mutation
//!
//! ## On-disk Layout
//! ```text
//! {storage_dir}/
//!   ├── notes.txt              (stored files, flat)
//!   ├── dup_482913.txt
//!   └── .filevault/
//!       ├── mappings.snapshot  (id → name table)
//!       └── tmp/               (uploads in progress)
//! ```

mod atomic;
mod manager;
pub mod mapping;
pub mod naming;
pub mod snapshot;

pub use atomic::write_atomically;
pub use manager::FileStore;
pub use mapping::MappingTable;
pub use naming::NamePolicy;
pub use snapshot::Snapshot;
