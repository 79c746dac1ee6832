//! Scorebook CLI - incremental MLB Stats API sync into SQLite

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scorebook")]
#[command(version)]
#[command(about = "Incremental MLB Stats API sync into a local SQLite database")]
#[command(long_about = r#"
Scorebook pulls games, rosters, boxscores and pitch-by-pitch data from the
MLB Stats API into a local SQLite database, politely and resumably:
  • One request at a time, spaced out, with retries on transient failures
  • Finished games are cached on disk and never fetched twice
  • Every unit of work is journaled, so an interrupted run can be resumed

Example usage:
  scorebook sync 745927
  scorebook sync --start-date 2024-06-01 --end-date 2024-06-30
  scorebook sync --season 2024
  scorebook sync --retry-failed
  scorebook failed
  scorebook stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a TOML config file (default: scorebook.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema without syncing anything
    InitDb {
        /// Path to the database file
        #[arg(short, long, env = "SCOREBOOK_DB")]
        database: Option<PathBuf>,
    },

    /// Fetch data from the MLB Stats API and load it into the database
    Sync {
        /// Game primary keys to sync, including boxscore and play-by-play
        #[arg(value_name = "GAME_PK")]
        game_pks: Vec<i64>,

        /// Start of an explicit date range (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", requires = "end_date")]
        start_date: Option<String>,

        /// End of an explicit date range (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", requires = "start_date")]
        end_date: Option<String>,

        /// Sync one full season's schedule
        #[arg(long, value_name = "YEAR")]
        season: Option<i32>,

        /// First season of a span (inclusive)
        #[arg(long, value_name = "YEAR", requires = "end_season")]
        start_season: Option<i32>,

        /// Last season of a span (inclusive)
        #[arg(long, value_name = "YEAR", requires = "start_season")]
        end_season: Option<i32>,

        /// Backfill every season from 2015 through the current one
        #[arg(long)]
        all: bool,

        /// Re-sync whatever the journal says did not complete
        #[arg(long)]
        retry_failed: bool,

        /// Ignore cached documents when reading; final ones are still written back
        #[arg(long)]
        force_refresh: bool,

        /// Keep syncing a unit even when one of its dependencies failed
        #[arg(long)]
        lenient: bool,

        /// Path to the database file
        #[arg(short, long, env = "SCOREBOOK_DB")]
        database: Option<PathBuf>,

        /// Directory holding cached final documents
        #[arg(long, env = "SCOREBOOK_CACHE")]
        cache_dir: Option<PathBuf>,
    },

    /// List units that did not complete, newest first
    Failed {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Path to the database file
        #[arg(short, long, env = "SCOREBOOK_DB")]
        database: Option<PathBuf>,
    },

    /// Show row counts and journal totals
    Stats {
        /// Path to the database file
        #[arg(short, long, env = "SCOREBOOK_DB")]
        database: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::InitDb { database } => commands::run_init_db(database, cli.config.as_deref()),
        Commands::Sync {
            game_pks,
            start_date,
            end_date,
            season,
            start_season,
            end_season,
            all,
            retry_failed,
            force_refresh,
            lenient,
            database,
            cache_dir,
        } => commands::run_sync(commands::SyncArgs {
            game_pks,
            start_date,
            end_date,
            season,
            start_season,
            end_season,
            all,
            retry_failed,
            force_refresh,
            lenient,
            database,
            cache_dir,
            config: cli.config,
        }),
        Commands::Failed { limit, database } => {
            commands::run_failed(limit, database, cli.config.as_deref())
        }
        Commands::Stats { database } => commands::run_stats(database, cli.config.as_deref()),
    }
}
