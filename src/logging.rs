//! Logging setup
//!
//! Installs the global `tracing` subscriber. Everything else in the crate
//! only emits events through the `tracing` macros.
//!
//! A target may name a console stream, a log file, or stdout and a file at
//! once; each destination is its own fmt layer over one shared filter.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogTarget;
use crate::error::{Result, VaultError};

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level` when it is set.
pub fn init(level: &str, target: &LogTarget) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| VaultError::Config(format!("invalid log level '{}': {}", level, e)))?,
    };

    let console = match target {
        LogTarget::Stdout | LogTarget::StdoutAndFile(_) => {
            Some(BoxMakeWriter::new(std::io::stdout))
        }
        LogTarget::Stderr => Some(BoxMakeWriter::new(std::io::stderr)),
        LogTarget::File(_) => None,
    };
    let file = target.file().map(open_log_file).transpose()?;

    let console_layer = console.map(|writer| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
    });
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| VaultError::Config(format!("logger already installed: {}", e)))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
