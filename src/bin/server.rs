//! FileVault Server Binary
//!
//! Starts the TCP server for FileVault.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use filevault::config::LogTarget;
use filevault::network::Server;
use filevault::{logging, Config, FileStore};
use signal_hook::consts::{SIGINT, SIGTERM};

/// FileVault Server
#[derive(Parser, Debug)]
#[command(name = "filevault-server")]
#[command(about = "Network file-storage server")]
#[command(version)]
struct Args {
    /// Host or IP to bind
    #[arg(long, env = "FILEVAULT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// TCP port
    #[arg(short, long, env = "FILEVAULT_PORT", default_value = "8080")]
    port: u16,

    /// Storage directory
    #[arg(short = 'd', long, env = "FILEVAULT_STORAGE_DIR", default_value = "./storage")]
    storage_dir: PathBuf,

    /// Worker threads (concurrent connections)
    #[arg(short, long, env = "FILEVAULT_WORKERS", default_value = "100")]
    workers: usize,

    /// Allowed file extensions, comma-separated
    #[arg(long, env = "FILEVAULT_ALLOWED_TYPES", default_value = "txt,jpg,png,gif,pdf,docx")]
    allowed_types: String,

    /// Largest accepted upload in bytes
    #[arg(long, env = "FILEVAULT_MAX_FILE_SIZE", default_value = "52428800")]
    max_file_size: usize,

    /// Log level or filter directive
    #[arg(long, env = "FILEVAULT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log destination: stdout, stderr, a file path, or stdout+<path> for both
    #[arg(long, env = "FILEVAULT_LOG_TARGET", default_value = "stdout")]
    log_target: String,

    /// Socket read timeout in milliseconds (0 = none)
    #[arg(long, env = "FILEVAULT_READ_TIMEOUT_MS", default_value = "30000")]
    read_timeout_ms: u64,

    /// Socket write timeout in milliseconds (0 = none)
    #[arg(long, env = "FILEVAULT_WRITE_TIMEOUT_MS", default_value = "30000")]
    write_timeout_ms: u64,

    /// Time given to in-flight requests on shutdown, in milliseconds
    #[arg(long, env = "FILEVAULT_SHUTDOWN_GRACE_MS", default_value = "30000")]
    shutdown_grace_ms: u64,

    /// Time given to cancelled work before giving up, in milliseconds
    #[arg(long, env = "FILEVAULT_FORCE_SHUTDOWN_GRACE_MS", default_value = "10000")]
    force_shutdown_grace_ms: u64,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging
    let log_target = LogTarget::parse(&args.log_target);
    if let Err(e) = logging::init(&args.log_level, &log_target) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    tracing::info!("FileVault Server v{}", filevault::VERSION);
    tracing::info!("Storage directory: {}", args.storage_dir.display());

    // Build config from args
    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .storage_dir(&args.storage_dir)
        .worker_threads(args.workers)
        .allowed_extensions(&args.allowed_types)
        .max_file_size(args.max_file_size)
        .log_level(&args.log_level)
        .log_target(log_target)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .shutdown_grace_ms(args.shutdown_grace_ms)
        .force_shutdown_grace_ms(args.force_shutdown_grace_ms)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    // Open store
    let store = match FileStore::from_config(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open file store: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, store) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    // SIGINT/SIGTERM flip the shutdown flag; the accept loop notices it.
    let shutdown = server.shutdown_handle();
    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, shutdown.flag()) {
            tracing::error!("Failed to register signal {}: {}", signal, e);
            std::process::exit(1);
        }
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
