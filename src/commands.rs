use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::HumanDuration;

use scorebook::api::StatsClient;
use scorebook::cache::ResponseCache;
use scorebook::config::{self, ScorebookConfig};
use scorebook::dates;
use scorebook::journal::SyncJournal;
use scorebook::storage::SqliteStore;
use scorebook::sync::{DependencyPolicy, Orchestrator, SyncOptions, SyncPlan};
use scorebook::ui::{self, Icons, SyncProgress};

pub struct SyncArgs {
    pub game_pks: Vec<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub season: Option<i32>,
    pub start_season: Option<i32>,
    pub end_season: Option<i32>,
    pub all: bool,
    pub retry_failed: bool,
    pub force_refresh: bool,
    pub lenient: bool,
    pub database: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

fn load_effective_config(path: Option<&Path>) -> anyhow::Result<ScorebookConfig> {
    match config::load_config(path)? {
        Some(loaded) => {
            let shown = path
                .map(Path::to_path_buf)
                .unwrap_or_else(config::default_config_path);
            println!("{}", ui::dim(&format!("Using config from {}", shown.display())));
            Ok(loaded)
        }
        None => {
            if let Some(path) = path {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            Ok(ScorebookConfig::default())
        }
    }
}

fn resolve_database(flag: Option<PathBuf>, config: &ScorebookConfig) -> PathBuf {
    flag.or_else(|| config.paths.database.clone())
        .unwrap_or_else(|| PathBuf::from("scorebook.db"))
}

fn resolve_cache_dir(flag: Option<PathBuf>, config: &ScorebookConfig, database: &Path) -> PathBuf {
    flag.or_else(|| config.paths.cache_dir.clone())
        .unwrap_or_else(|| database.with_extension("cache"))
}

pub fn run_init_db(database: Option<PathBuf>, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_effective_config(config_path)?;
    let db_path = resolve_database(database, &config);
    config::ensure_db_dir(&db_path)?;

    let store = SqliteStore::open(&db_path)?;
    let version = store.meta_value("schema_version")?.unwrap_or_default();
    ui::success(&format!(
        "Database ready at {} (schema v{})",
        db_path.display(),
        version
    ));
    Ok(())
}

pub fn run_sync(args: SyncArgs) -> anyhow::Result<()> {
    let config = load_effective_config(args.config.as_deref())?;
    let db_path = resolve_database(args.database, &config);
    let cache_dir = resolve_cache_dir(args.cache_dir, &config, &db_path);

    let selections = [
        !args.game_pks.is_empty(),
        args.start_date.is_some(),
        args.season.is_some(),
        args.start_season.is_some(),
        args.all,
        args.retry_failed,
    ];
    if selections.iter().filter(|on| **on).count() != 1 {
        anyhow::bail!(
            "pick exactly one way to select games: explicit GAME_PK arguments, \
             --start-date/--end-date, --season, --start-season/--end-season, \
             --all, or --retry-failed"
        );
    }

    let plan = if !args.game_pks.is_empty() {
        SyncPlan::Games(args.game_pks)
    } else if let (Some(start), Some(end)) = (&args.start_date, &args.end_date) {
        let start = dates::parse_date(start)?;
        let end = dates::parse_date(end)?;
        dates::validate_range(start, end)?;
        SyncPlan::Dates {
            ranges: vec![(start, end)],
        }
    } else if let Some(year) = args.season {
        SyncPlan::Dates {
            ranges: vec![dates::season_range(year)?],
        }
    } else if let (Some(first), Some(last)) = (args.start_season, args.end_season) {
        SyncPlan::Dates {
            ranges: dates::season_ranges(first, last)?,
        }
    } else if args.all {
        SyncPlan::Dates {
            ranges: dates::season_ranges(dates::FIRST_TRACKED_SEASON, dates::current_season())?,
        }
    } else {
        SyncPlan::RetryFailed
    };

    let mut options = SyncOptions {
        force_refresh: args.force_refresh,
        dependency_policy: config.dependency_policy()?,
    };
    if args.lenient {
        options.dependency_policy = DependencyPolicy::Lenient;
    }

    ui::header("Scorebook sync");
    ui::status(Icons::DATABASE, "Database", &db_path.display().to_string());
    ui::status(Icons::PACKAGE, "Cache", &cache_dir.display().to_string());
    ui::status(Icons::CALENDAR, "Plan", &describe_plan(&plan));
    if options.dependency_policy == DependencyPolicy::Lenient {
        ui::warn("Dependency failures will not stop dependent units");
    }

    config::ensure_db_dir(&db_path)?;
    let store = SqliteStore::open(&db_path)?;
    let journal = SyncJournal::open(&db_path)?;
    let cache = ResponseCache::new(&cache_dir);
    let client = StatsClient::new(config.client_config())?;

    if matches!(plan, SyncPlan::RetryFailed) {
        let pending = journal.failed_units()?;
        if pending.is_empty() {
            ui::success("Nothing to retry; the journal is clean");
            return Ok(());
        }
        ui::info(
            "Retrying",
            &format!("{} unit(s) that did not complete", pending.len()),
        );
    }

    let (progress, events) = SyncProgress::start();
    let mut orchestrator =
        Orchestrator::new(client, cache, store, journal, options).with_progress(events);

    let started = Instant::now();
    let report = orchestrator.run(plan)?;
    progress.finish();

    println!();
    if report.all_succeeded() {
        ui::success(&format!("Synced {} unit(s)", report.completed));
    }
    ui::summary_row("Run", &report.run_id.to_string());
    ui::summary_row("Completed", &report.completed.to_string());
    ui::summary_row("Failed", &report.failed.to_string());
    ui::summary_row("Rows written", &report.rows_written.to_string());
    ui::summary_row("Cache hits", &report.cache_hits.to_string());
    ui::summary_row("Elapsed", &HumanDuration(started.elapsed()).to_string());

    if !report.failures.is_empty() {
        println!();
        ui::error(&format!("{} unit(s) failed:", report.failures.len()));
        for (key, message) in &report.failures {
            println!("  {} {} {}", Icons::CROSS, key, ui::muted(message));
        }
        println!(
            "{}",
            ui::dim("Run `scorebook sync --retry-failed` to try them again.")
        );
    }

    if report.cancelled {
        anyhow::bail!("sync run was cancelled before finishing");
    }
    if report.failed > 0 {
        anyhow::bail!("{} unit(s) did not complete", report.failed);
    }
    Ok(())
}

pub fn run_failed(
    limit: usize,
    database: Option<PathBuf>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_effective_config(config_path)?;
    let db_path = resolve_database(database, &config);
    if !db_path.exists() {
        anyhow::bail!("no database at {}; run a sync first", db_path.display());
    }

    let journal = SyncJournal::open(&db_path)?;
    let records = journal.recent_failures(limit)?;
    if records.is_empty() {
        println!("{}", ui::muted("No failures on record."));
        return Ok(());
    }

    ui::section("Units that did not complete");
    println!("{}", ui::failures_table(&records));
    println!(
        "{}",
        ui::dim("Run `scorebook sync --retry-failed` to try them again.")
    );
    Ok(())
}

pub fn run_stats(database: Option<PathBuf>, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_effective_config(config_path)?;
    let db_path = resolve_database(database, &config);
    if !db_path.exists() {
        anyhow::bail!("no database at {}; run a sync first", db_path.display());
    }

    let store = SqliteStore::open(&db_path)?;
    let journal = SyncJournal::open(&db_path)?;
    let stats = store.stats()?;
    let (completed, failed, started) = journal.status_counts()?;

    ui::status(Icons::STATS, "Statistics for", &db_path.display().to_string());

    ui::section("Row counts");
    let rows = [
        ("Teams", stats.teams.to_string()),
        ("Venues", stats.venues.to_string()),
        ("Players", stats.players.to_string()),
        ("Games", stats.games.to_string()),
        ("Batting lines", stats.batting_lines.to_string()),
        ("Pitching lines", stats.pitching_lines.to_string()),
        ("At-bats", stats.at_bats.to_string()),
        ("Pitches", stats.pitches.to_string()),
    ];
    let rows: Vec<(&str, &str)> = rows
        .iter()
        .map(|(label, value)| (*label, value.as_str()))
        .collect();
    println!("{}", ui::stats_table(&rows));

    ui::section("Journal");
    ui::summary_row("Completed", &completed.to_string());
    ui::summary_row("Failed", &failed.to_string());
    ui::summary_row("Interrupted", &started.to_string());
    Ok(())
}

fn describe_plan(plan: &SyncPlan) -> String {
    match plan {
        SyncPlan::Games(pks) => format!("{} game(s) by primary key", pks.len()),
        SyncPlan::Dates { ranges } => match ranges.as_slice() {
            [(start, end)] => format!("schedule from {} to {}", start, end),
            ranges => format!("schedule over {} date ranges", ranges.len()),
        },
        SyncPlan::RetryFailed => "retry of units that did not complete".to_string(),
    }
}
