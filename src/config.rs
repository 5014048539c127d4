//! Configuration for FileVault
//!
//! Centralized configuration with sensible defaults. Resolved once at startup
//! and immutable afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, VaultError};

/// Main configuration for a FileVault instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Host or IP to bind
    pub host: String,

    /// TCP port to bind (0 picks an ephemeral port)
    pub port: u16,

    /// Number of worker threads serving connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// How long shutdown waits for in-flight work before forcing it
    pub shutdown_grace_ms: u64,

    /// How long shutdown waits after forcing before giving up on workers
    pub force_shutdown_grace_ms: u64,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for stored files
    /// Internal structure:
    ///   {storage_dir}/
    ///     ├── <stored files>
    ///     └── .filevault/
    ///         ├── mappings.snapshot
    ///         └── tmp/
    pub storage_dir: PathBuf,

    /// Allowed extensions, lowercase, without the leading dot
    pub allowed_extensions: Vec<String>,

    /// Largest accepted upload in bytes
    pub max_file_size: usize,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Level directive for the log filter ("info", "debug", "filevault=trace"...)
    pub log_level: String,

    /// Where log lines go
    pub log_target: LogTarget,
}

/// Destination for log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
    /// Append to the file at this path
    File(PathBuf),
    /// Write to stdout and append to the file at this path
    StdoutAndFile(PathBuf),
}

impl LogTarget {
    /// Parse "stdout", "stderr", "stdout+<path>" or a file path
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "stdout" => LogTarget::Stdout,
            "stderr" => LogTarget::Stderr,
            value => match value.strip_prefix("stdout+") {
                Some(path) if !path.trim().is_empty() => {
                    LogTarget::StdoutAndFile(PathBuf::from(path.trim()))
                }
                Some(_) => LogTarget::Stdout,
                None => LogTarget::File(PathBuf::from(value)),
            },
        }
    }

    /// Log file this target appends to, if any
    pub fn file(&self) -> Option<&Path> {
        match self {
            LogTarget::File(path) | LogTarget::StdoutAndFile(path) => Some(path),
            LogTarget::Stdout | LogTarget::Stderr => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            worker_threads: 100,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            shutdown_grace_ms: 30_000,
            force_shutdown_grace_ms: 10_000,
            storage_dir: PathBuf::from("./storage"),
            allowed_extensions: parse_extensions("txt,jpg,png,gif,pdf,docx"),
            max_file_size: 50 * 1024 * 1024, // 50 MB
            log_level: "info".to_string(),
            log_target: LogTarget::Stdout,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` string suitable for binding
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.write_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn force_shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.force_shutdown_grace_ms)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(VaultError::Config("host cannot be empty".into()));
        }
        if self.worker_threads == 0 {
            return Err(VaultError::Config(
                "worker_threads must be at least 1".into(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(VaultError::Config(
                "allowed_extensions cannot be empty".into(),
            ));
        }
        if self.max_file_size > i32::MAX as usize {
            return Err(VaultError::Config(format!(
                "max_file_size {} exceeds the wire limit of {} bytes",
                self.max_file_size,
                i32::MAX
            )));
        }
        Ok(())
    }
}

/// Normalize a comma-separated extension list: trimmed, lowercase, no dot
///
/// "txt, .PNG,,pdf" → ["txt", "png", "pdf"]
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the bind host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the bind port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the worker pool size
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the graceful shutdown window (in milliseconds)
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_grace_ms = ms;
        self
    }

    /// Set the post-cancel shutdown window (in milliseconds)
    pub fn force_shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.force_shutdown_grace_ms = ms;
        self
    }

    /// Set the storage directory
    pub fn storage_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = path.into();
        self
    }

    /// Set the allowed extensions from a comma-separated list
    pub fn allowed_extensions(mut self, list: &str) -> Self {
        self.config.allowed_extensions = parse_extensions(list);
        self
    }

    /// Set the maximum accepted upload size (in bytes)
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    /// Set the log level directive
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Set the log target
    pub fn log_target(mut self, target: LogTarget) -> Self {
        self.config.log_target = target;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
