//! # Profile Harvest CLI (`harvest`)
//!
//! ## Usage
//!
//! ```bash
//! harvest --config ./config/harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest run` | Export composite documents, one JSON array per batch |
//! | `harvest users` | Resolve the run's users and report the batch count |
//! | `harvest entities` | List registered entity types and their lookups |
//! | `harvest check` | Probe both databases |
//! | `harvest payload` | Flatten an export artifact into JSONL payloads |
//!
//! Logs go to stderr and honour `RUST_LOG`; `--verbose` raises the
//! default level to `debug`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use profile_harvest::config::{self, Config};
use profile_harvest::export::{self, RunOptions};
use profile_harvest::progress::ProgressMode;
use profile_harvest::{payload, sources};

/// Profile Harvest: extract per-user profile documents from Postgres.
#[derive(Parser)]
#[command(name = "harvest", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/harvest.toml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export documents for every user, batch by batch.
    ///
    /// Each batch is appended to the output file as one JSON array.
    /// A failed batch is not written; rerun with `--start-batch`.
    Run {
        /// CSV of user UUIDs. Overrides `[input]` in the config.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Users per batch. Overrides `extract.batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Skip this many leading batches.
        #[arg(long, default_value_t = 0)]
        start_batch: usize,

        /// Process at most this many users.
        #[arg(long)]
        limit: Option<usize>,

        /// Resolve users and report batch counts without exporting.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Resolve the run's users.
    Users {
        /// CSV of user UUIDs. Overrides `[input]` in the config.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Print every identifier instead of a summary.
        #[arg(long)]
        list: bool,
    },

    /// List registered entity types.
    Entities {
        /// Show only this entity type.
        name: Option<String>,
    },

    /// Check that both databases are reachable.
    Check,

    /// Flatten an export artifact into embedding payloads (JSONL).
    Payload {
        /// Export artifact. Defaults to `output.path`.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Destination file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    sources::validate_registry()?;

    // Commands that don't require a database
    match &cli.command {
        Commands::Entities { name } => {
            sources::show_entities(name.as_deref())?;
            return Ok(());
        }
        Commands::Payload { input, output } => {
            // Defaults only when there is no config file; a broken one is an error
            let cfg = if cli.config.exists() {
                config::load_config(&cli.config)?
            } else {
                tracing::warn!(config = %cli.config.display(), "config file not found, using defaults");
                Config::minimal()
            };
            payload::run_payload(&cfg, input.as_deref(), output.as_deref())?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            input,
            batch_size,
            start_batch,
            limit,
            dry_run,
            progress,
        } => {
            let opts = RunOptions {
                input,
                batch_size,
                start_batch,
                limit,
                dry_run,
                progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
            };
            export::run_export(&cfg, opts).await?;
        }
        Commands::Users { input, list } => {
            sources::list_users(&cfg, input.as_deref(), list).await?;
        }
        Commands::Check => {
            sources::check_sources(&cfg).await?;
        }
        Commands::Entities { .. } | Commands::Payload { .. } => unreachable!(),
    }

    Ok(())
}
