//! FileVault CLI Client
//!
//! Command-line interface for interacting with a FileVault server.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use filevault::config::LogTarget;
use filevault::protocol::Response;
use filevault::{logging, Client};

/// FileVault CLI
#[derive(Parser, Debug)]
#[command(name = "filevault-cli")]
#[command(about = "CLI for the FileVault file server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, env = "FILEVAULT_SERVER", default_value = "127.0.0.1:8080")]
    server: String,

    /// Socket timeout in milliseconds
    #[arg(short, long, default_value = "30000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a file
    Put {
        /// Local file to upload
        path: PathBuf,

        /// Name to store it under (defaults to the local file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Download a file by id
    GetId {
        id: i32,

        /// Write the contents here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Download a file by name
    GetName {
        name: String,

        /// Write the contents here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete a file by id
    DelId { id: i32 },

    /// Delete a file by name
    DelName { name: String },
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init("warn", &LogTarget::Stderr) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(args) {
        Ok(response) if response.status.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> filevault::Result<Response> {
    let client = Client::new(args.server).with_timeout(Duration::from_millis(args.timeout_ms));

    let (response, out) = match args.command {
        Commands::Put { path, name } => {
            let data = fs::read(&path)?;
            let name = name.unwrap_or_else(|| file_name_of(&path));
            (client.put(&name, &data)?, None)
        }
        Commands::GetId { id, out } => (client.get_by_id(id)?, out),
        Commands::GetName { name, out } => (client.get_by_name(&name)?, out),
        Commands::DelId { id } => (client.delete_by_id(id)?, None),
        Commands::DelName { name } => (client.delete_by_name(&name)?, None),
    };

    // Status goes to stderr so stdout carries nothing but file contents.
    eprintln!("{}", response.status);
    if let Some(id) = response.id {
        eprintln!("id: {}", id);
    }

    if let Some(payload) = &response.payload {
        match out {
            Some(path) => {
                fs::write(&path, payload)?;
                eprintln!("wrote {} bytes to {}", payload.len(), path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(payload)?;
                stdout.flush()?;
            }
        }
    }

    Ok(response)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
