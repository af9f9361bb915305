mod glob_util;
mod images;
mod load;
mod parse;
mod status;

use crate::images::EntryType;
use crate::loader::DEFAULT_BATCH_SIZE;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "compendium-loader")]
#[command(version)]
#[command(about = "Load compendium SQL migrations through the REST API and generate entry artwork", long_about = None)]
pub struct Cli {
    /// Log per-file and per-batch progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse INSERT statements from a SQL file and show the resulting rows
    Parse {
        /// Input SQL file
        file: PathBuf,

        /// Print every parsed row as JSON
        #[arg(long)]
        json: bool,
    },

    /// Insert rows from SQL migration files through the REST API
    Load {
        /// Input SQL file or glob pattern (e.g., migrations/*monsters*.sql)
        file: PathBuf,

        /// Target table (defaults to the table named in each INSERT)
        #[arg(short, long)]
        table: Option<String>,

        /// Rows per bulk request
        #[arg(short, long, default_value_t = NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap())]
        batch_size: NonZeroUsize,

        /// Show progress while sending batches
        #[arg(short, long)]
        progress: bool,

        /// Stop on first file that cannot be read
        #[arg(long)]
        fail_fast: bool,
    },

    /// Generate artwork for compendium entries that have none
    Images {
        /// Entry type to process
        #[arg(value_enum)]
        entry_type: EntryType,

        /// Maximum entries to process (default: batch.size from config)
        #[arg(short, long)]
        limit: Option<usize>,

        /// YAML or JSON image generation config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show how many entries of each type have artwork
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Install the stderr tracing subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Parse { file, json } => parse::run(file, json),
        Commands::Load {
            file,
            table,
            batch_size,
            progress,
            fail_fast,
        } => load::run(file, table, batch_size, progress, fail_fast),
        Commands::Images {
            entry_type,
            limit,
            config,
        } => images::run(entry_type, limit, config),
        Commands::Status => status::run(),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "compendium-loader",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
