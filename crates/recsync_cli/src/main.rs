//! recsync CLI
//!
//! Command-line tools for reconciling file-backed record stores.
//!
//! # Commands
//!
//! - `init` - Create an empty store from a schema file
//! - `sync-all` - Mirror every master record into the slave store
//! - `clear-slave` - Wipe a slave store and reset its key sequence
//! - `inspect` - Display store schema and record count

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// recsync command-line tools.
#[derive(Parser)]
#[command(name = "recsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty store from a schema file
    Init {
        /// Path of the store file to create
        #[arg(long)]
        store: PathBuf,

        /// JSON file holding the record schema
        #[arg(long)]
        schema: PathBuf,

        /// Replace an existing store file
        #[arg(long)]
        force: bool,
    },

    /// Mirror every master record into the slave store
    SyncAll {
        /// Master store file
        #[arg(long)]
        master: PathBuf,

        /// Slave store file
        #[arg(long)]
        slave: PathBuf,

        /// JSON file with the field map and sync options
        #[arg(long)]
        settings: PathBuf,

        /// Empty the slave store before syncing
        #[arg(long)]
        clear: bool,

        /// Records per batch (defaults to the settings value)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Wipe a slave store and reset its key sequence
    ClearSlave {
        /// Slave store file
        #[arg(long)]
        slave: PathBuf,
    },

    /// Display store schema and record count
    Inspect {
        /// Store file
        #[arg(long)]
        store: PathBuf,

        /// List record keys
        #[arg(short, long)]
        keys: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init {
            store,
            schema,
            force,
        } => {
            commands::init::run(&store, &schema, force)?;
        }
        Commands::SyncAll {
            master,
            slave,
            settings,
            clear,
            batch_size,
            format,
        } => {
            let stores = commands::sync_all::Stores {
                master: &master,
                slave: &slave,
                settings: &settings,
            };
            commands::sync_all::run(&stores, clear, batch_size, &format)?;
        }
        Commands::ClearSlave { slave } => {
            commands::clear_slave::run(&slave)?;
        }
        Commands::Inspect {
            store,
            keys,
            format,
        } => {
            commands::inspect::run(&store, keys, &format)?;
        }
        Commands::Version => {
            println!("recsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
