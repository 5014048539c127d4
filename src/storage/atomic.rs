//! Atomic file replacement
//!
//! Content goes to a temporary file first, is synced, then renamed over the
//! target. Readers see either the old file (or none) or the complete new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write `data` to `temp`, sync it, and rename it onto `target`
///
/// On failure the temporary file is removed; `target` is left untouched.
pub fn write_atomically(temp: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let result = write_and_rename(temp, target, data);

    if result.is_err() {
        match fs::remove_file(temp) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to remove temp file {}: {}", temp.display(), e);
            }
        }
    }

    result
}

fn write_and_rename(temp: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp, target)
}
