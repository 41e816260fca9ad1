//! downtime: command-line front end for recording production stoppages.
//!
//! Operators open a stoppage when a process halts and close it when work
//! resumes. Closed stoppages go to the history table, which can be listed,
//! summarised or wiped.
//!
//! ## Subcommands
//!
//! - `open`: Start a stoppage for a process and reason
//! - `list`: Show open stoppages with elapsed minutes
//! - `close`: Finish a stoppage by id or list position
//! - `history` / `summary` / `wipe`: Inspect or clear recorded history
//! - `reasons`: Show the reason catalog
//! - `config`: Storage directory and remembered user
//! - `status`: One-line status

mod commands;
mod logging;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use downtime_core::{DowntimeEngine, StorageConfig};

use commands::CliError;

#[derive(Parser)]
#[command(name = "downtime")]
#[command(about = "Shop-floor downtime tracker")]
#[command(version)]
struct Cli {
    /// App directory for settings, open stoppages and logs
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a stoppage
    Open {
        /// Employee name (defaults to the remembered user)
        #[arg(long, short)]
        employee: Option<String>,

        /// Process name or slug (e.g. "Raku-Raku", inspecao)
        #[arg(long, short)]
        process: String,

        /// Reason from the catalog
        #[arg(long, short, required_unless_present = "other")]
        reason: Option<String>,

        /// Free-text reason, for processes that accept one
        #[arg(long, conflicts_with = "reason")]
        other: Option<String>,
    },

    /// List open stoppages
    List,

    /// Close a stoppage
    Close {
        /// Stoppage id, or its position in `list`
        #[arg(value_name = "ID")]
        target: String,
    },

    /// Print every history row
    History,

    /// Downtime totals per process and per reason
    Summary {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete all recorded history
    Wipe {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the reason catalog
    Reasons {
        #[arg(value_name = "PROCESS")]
        process: Option<String>,
    },

    /// Settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// One-line status
    Status,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print current settings
    Show,

    /// Change where history is written
    SetDir {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Remember a user for the next start
    Remember {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Forget the remembered user
    Forget,
}

fn run(engine: &mut DowntimeEngine, command: Commands) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    match command {
        Commands::Open {
            employee,
            process,
            reason,
            other,
        } => commands::open(engine, employee, &process, reason.as_deref(), other, &mut out),
        Commands::List => commands::list(engine, &mut out),
        Commands::Close { target } => commands::close(engine, &target, &mut out),
        Commands::History => commands::history(engine, &mut out),
        Commands::Summary { json } => commands::summary(engine, json, &mut out),
        Commands::Wipe { yes } => commands::wipe(engine, yes, &mut out),
        Commands::Reasons { process } => commands::reasons(process.as_deref(), &mut out),
        Commands::Config(ConfigCommand::Show) => commands::config_show(engine, &mut out),
        Commands::Config(ConfigCommand::SetDir { dir }) => {
            commands::config_set_dir(engine, dir, &mut out)
        }
        Commands::Config(ConfigCommand::Remember { name }) => {
            commands::config_remember(engine, Some(&name), &mut out)
        }
        Commands::Config(ConfigCommand::Forget) => {
            commands::config_remember(engine, None, &mut out)
        }
        Commands::Status => commands::status(engine, &mut out),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let storage = match cli.root {
        Some(root) => StorageConfig::with_root(root),
        None => match StorageConfig::new() {
            Ok(storage) => storage,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };
    // Held until main returns; process::exit would skip the file flush.
    let _logging_guard = logging::init(&storage.logs_dir());

    let mut engine = match DowntimeEngine::with_storage(storage) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start downtime engine");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&mut engine, cli.command);

    if let Err(e) = engine.shutdown() {
        tracing::warn!(error = %e, "Failed to save open stoppages on exit");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "downtime failed");
            ExitCode::FAILURE
        }
    }
}
