//! CLI tool for struct database files.
//!
//! Provides commands for:
//! - Inspecting table sizes and entries
//! - Resolving lookups the way `fill` does
//! - Merging databases collected on different machines

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the struct database tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show entry, tree and revision counts
    Info {
        /// Database file (defaults to the configured database)
        file: Option<PathBuf>,
    },
    /// List stored entries
    Dump {
        /// Database file (defaults to the configured database)
        file: Option<PathBuf>,
        /// Only entries for this class id
        #[arg(long)]
        class: Option<i32>,
        /// Only entries for this revision
        #[arg(long)]
        revision: Option<String>,
        /// Print JSON including the full trees
        #[arg(long)]
        json: bool,
    },
    /// Show which entry a lookup resolves to
    Lookup {
        class_id: i32,
        revision: String,
        /// Database file (defaults to the configured database)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Exact revision match only
        #[arg(long)]
        strict: bool,
    },
    /// Import missing entries from other database files into a target
    Merge {
        /// Database file to update
        target: PathBuf,
        /// Database files to import from
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(args.config.as_deref())?;
    let mut out = std::io::stdout().lock();

    match args.command {
        Command::Info { file } => {
            commands::info(&mut out, &commands::database_file(&config, file))
        }
        Command::Dump {
            file,
            class,
            revision,
            json,
        } => {
            let filter = commands::DumpFilter { class, revision };
            commands::dump(
                &mut out,
                &commands::database_file(&config, file),
                &filter,
                json,
            )
        }
        Command::Lookup {
            class_id,
            revision,
            file,
            strict,
        } => commands::lookup(
            &mut out,
            &commands::database_file(&config, file),
            class_id,
            &revision,
            strict,
        ),
        Command::Merge { target, sources } => {
            commands::merge(&mut out, &config, &target, &sources)
        }
    }
}
