//! Logging Tests
//!
//! The subscriber is process-global, so this binary installs it once.

use filevault::config::LogTarget;
use filevault::logging;
use tempfile::TempDir;

#[test]
fn test_console_and_file_target_writes_file() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("logs").join("server.log");

    logging::init("info", &LogTarget::StdoutAndFile(log_file.clone())).unwrap();
    tracing::warn!("console and file");

    let contents = std::fs::read_to_string(&log_file).unwrap();
    assert!(contents.contains("console and file"));
    // File output carries no color codes
    assert!(!contents.contains('\u{1b}'));

    // A second install is refused
    assert!(logging::init("info", &LogTarget::Stderr).is_err());
}
