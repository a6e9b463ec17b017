//! Dredge command-line launcher
//!
//! - `scan`: run configured file-list entities and print their records
//! - `cat`: resolve a path (plain file or archive entry) and copy it to stdout

use clap::{Parser, Subcommand};
use dredge_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "dredge", about = "Filtered file discovery with archive fallback")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Also write logs to this directory (daily files)
    #[arg(long, global = true, env = "DREDGE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List files matching the configured entities
    Scan {
        /// TOML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Only run this entity (default: all)
        #[arg(short, long)]
        entity: Option<String>,

        /// Output JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Open a file, falling back to the zip archive in its directory
    Cat {
        /// Path relative to the base path
        query: String,

        /// Base directory (default: working directory)
        #[arg(short, long, conflicts_with = "source")]
        base_path: Option<PathBuf>,

        /// Character encoding of the file (UTF-8, ISO-8859-1)
        #[arg(long, conflicts_with = "source")]
        encoding: Option<String>,

        /// TOML configuration file holding data sources
        #[arg(short, long, requires = "source")]
        config: Option<PathBuf>,

        /// Data source name from the configuration
        #[arg(short, long, requires = "config")]
        source: Option<String>,
    },
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Scan {
            config,
            entity,
            json,
        } => cli::scan::run(cli::scan::ScanArgs {
            config,
            entity,
            json,
        }),
        Commands::Cat {
            query,
            base_path,
            encoding,
            config,
            source,
        } => cli::cat::run(cli::cat::CatArgs {
            query,
            base_path,
            encoding,
            config,
            source,
        }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "dredge",
        verbose: cli.verbose,
        file_logging: cli.log_dir.is_some(),
        log_dir: cli.log_dir.clone(),
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
