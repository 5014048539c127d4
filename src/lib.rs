//! # FileVault
//!
//! A network file-storage service with:
//! - A framed binary protocol (magic numbers, CRC-checked payloads)
//! - Atomic file commits (temp file + rename)
//! - A durable, bijective id ↔ filename index
//! - One request per connection over a bounded worker pool
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Acceptor                            │
//! │                  (single thread, polls)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one job per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Worker Pool                               │
//! │         RequestHandler: read → dispatch → write              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │          │  FileStore  │
//!   │ (frames+CRC)│          │ (files+map) │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Snapshot   │
//!                           │ (id → name) │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod logging;

pub mod protocol;
pub mod storage;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VaultError, Result};
pub use config::Config;
pub use storage::FileStore;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FileVault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
