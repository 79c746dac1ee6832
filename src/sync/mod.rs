//! Sync orchestration.
//!
//! The orchestrator owns the client, cache, store and journal, and drives
//! every unit of work through its lifecycle: resolve dependencies, acquire
//! the document (cache first for final games), transform it into rows, and
//! commit them in one transaction. A journal record brackets each unit, so
//! a crash at any point is visible to the next `--retry-failed` run.
//!
//! Units are processed one at a time. Dependencies are driven depth-first
//! as they are found, each journaled as a unit of its own; a completed
//! game discovered from the schedule fans out into its boxscore and
//! play-by-play children.

pub mod unit;

pub use unit::{Freshness, UnitKey, UnitKind, UnitOfWork, UnitState};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use crossbeam::channel::Sender;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{HttpGateway, StatsClient};
use crate::cache::ResponseCache;
use crate::journal::SyncJournal;
use crate::model;
use crate::resolver;
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// What to do when a dependency unit ends Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyPolicy {
    /// Fail the dependent unit without fetching it
    #[default]
    Strict,
    /// Log and continue; the commit may still be rejected by foreign keys
    Lenient,
}

/// Per-run behavior switches
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Bypass cache reads; final documents are still written back
    pub force_refresh: bool,
    pub dependency_policy: DependencyPolicy,
}

/// What a run should sync
#[derive(Debug, Clone)]
pub enum SyncPlan {
    /// Specific games by gamePk, including their detail documents
    Games(Vec<i64>),
    /// Every game listed on the schedule for these inclusive date ranges
    Dates { ranges: Vec<(NaiveDate, NaiveDate)> },
    /// Whatever the journal says did not complete last time
    RetryFailed,
}

/// Progress notifications, sent best-effort to an optional channel
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// More units entered the run
    Discovered { count: usize },
    Started { unit: UnitKey },
    Completed { unit: UnitKey, from_cache: bool },
    Failed { unit: UnitKey, message: String },
}

/// Terminal result of one unit within a run
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub state: UnitState,
    pub is_final: bool,
    pub from_cache: bool,
    pub rows_written: usize,
    pub error: Option<String>,
}

impl UnitOutcome {
    fn failed(error: &Error) -> Self {
        Self {
            state: UnitState::Failed,
            is_final: false,
            from_cache: false,
            rows_written: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Summary of one sync run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub run_id: i64,
    pub completed: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub rows_written: usize,
    pub cancelled: bool,
    /// Failed units in the order they failed, with their error text
    pub failures: Vec<(UnitKey, String)>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }
}

/// A document in hand, with where it came from and whether it is final
struct Acquired {
    document: Value,
    is_final: bool,
    from_cache: bool,
}

pub struct Orchestrator<G: HttpGateway> {
    client: StatsClient<G>,
    cache: ResponseCache,
    store: SqliteStore,
    journal: SyncJournal,
    options: SyncOptions,
    cancelled: Arc<AtomicBool>,
    progress: Option<Sender<SyncEvent>>,
    outcomes: HashMap<UnitKey, UnitOutcome>,
    failures: Vec<(UnitKey, String)>,
    run_id: i64,
}

impl<G: HttpGateway> Orchestrator<G> {
    pub fn new(
        client: StatsClient<G>,
        cache: ResponseCache,
        store: SqliteStore,
        journal: SyncJournal,
        options: SyncOptions,
    ) -> Self {
        Self {
            client,
            cache,
            store,
            journal,
            options,
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: None,
            outcomes: HashMap::new(),
            failures: Vec::new(),
            run_id: 0,
        }
    }

    pub fn with_progress(mut self, sender: Sender<SyncEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Flag checked between units; set it to stop the run early
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn journal(&self) -> &SyncJournal {
        &self.journal
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    // ========== Run Loop ==========

    /// Execute one sync run. Unit failures are collected in the report;
    /// run-level problems (schedule fetch, journal writes) are errors.
    pub fn run(&mut self, plan: SyncPlan) -> Result<RunReport> {
        self.outcomes.clear();
        self.failures.clear();
        self.run_id = self.journal.begin_run()?;
        info!(run_id = self.run_id, "sync run starting");

        let seeds = self.discover(plan)?;
        self.emit(SyncEvent::Discovered { count: seeds.len() });
        let mut queue: VecDeque<UnitOfWork> = seeds.into();
        let mut cancelled = false;

        while let Some(mut unit) = queue.pop_front() {
            if self.cancelled.load(Ordering::Relaxed) {
                warn!(run_id = self.run_id, "sync run cancelled");
                cancelled = true;
                break;
            }
            if self.outcomes.contains_key(&unit.key) {
                debug!(unit = %unit.key, "already driven this run");
                continue;
            }

            let outcome = self.process_unit(&mut unit)?;
            let completed = outcome.state == UnitState::Completed;
            let is_final = outcome.is_final;
            self.record(unit.key, outcome);

            // a completed schedule game fans out into its detail documents
            if completed && unit.cascade && unit.key.kind == UnitKind::Game {
                if let Some(document) = unit.document.as_ref() {
                    let player_deps =
                        resolver::resolve_dependencies(UnitKind::Boxscore, document);
                    for kind in [UnitKind::Boxscore, UnitKind::PlayByPlay] {
                        let child = UnitOfWork::discovered(
                            UnitKey::new(kind, unit.key.id),
                            player_deps.clone(),
                        )
                        .with_parent_final(is_final);
                        queue.push_back(child);
                    }
                    self.emit(SyncEvent::Discovered { count: 2 });
                }
            }
        }

        let mut report = RunReport {
            run_id: self.run_id,
            cancelled,
            failures: self.failures.clone(),
            ..Default::default()
        };
        for outcome in self.outcomes.values() {
            match outcome.state {
                UnitState::Completed => {
                    report.completed += 1;
                    report.rows_written += outcome.rows_written;
                    if outcome.from_cache {
                        report.cache_hits += 1;
                    }
                }
                _ => report.failed += 1,
            }
        }
        if report.failed > 0 {
            warn!(
                run_id = report.run_id,
                completed = report.completed,
                failed = report.failed,
                "sync run finished with failures"
            );
        } else {
            info!(
                run_id = report.run_id,
                completed = report.completed,
                rows = report.rows_written,
                cache_hits = report.cache_hits,
                "sync run finished"
            );
        }
        Ok(report)
    }

    /// Seed units for a plan. Schedule fetches happen here; a schedule that
    /// cannot be fetched or parsed fails the whole run.
    fn discover(&mut self, plan: SyncPlan) -> Result<Vec<UnitOfWork>> {
        match plan {
            SyncPlan::Games(pks) => Ok(pks
                .into_iter()
                .map(|pk| {
                    UnitOfWork::bare(UnitKey::new(UnitKind::Game, pk)).with_cascade()
                })
                .collect()),
            SyncPlan::Dates { ranges } => {
                let mut units = Vec::new();
                for (start, end) in ranges {
                    debug!(%start, %end, "fetching schedule");
                    let schedule = self.client.fetch_schedule(start, end)?;
                    units.extend(games_from_schedule(&schedule)?);
                }
                info!(count = units.len(), "schedule listed games to sync");
                Ok(units)
            }
            SyncPlan::RetryFailed => {
                let failed = self.journal.failed_units()?;
                info!(count = failed.len(), "retrying units that did not complete");
                Ok(failed
                    .into_iter()
                    .map(|key| {
                        let unit = UnitOfWork::bare(key);
                        // a failed game gets its details re-checked too
                        if key.kind == UnitKind::Game {
                            unit.with_cascade()
                        } else {
                            unit
                        }
                    })
                    .collect())
            }
        }
    }

    // ========== Unit Lifecycle ==========

    /// Journal, drive, finalize. Errors while driving become a Failed
    /// outcome for the unit; a journal write failure aborts the run itself,
    /// leaving Started records behind for `--retry-failed`.
    fn process_unit(&mut self, unit: &mut UnitOfWork) -> Result<UnitOutcome> {
        self.emit(SyncEvent::Started { unit: unit.key });
        let entry = self.journal.begin_unit(self.run_id, &unit.key)?;

        match self.drive(unit) {
            Ok(outcome) => {
                self.journal.complete_unit(&entry, outcome.rows_written)?;
                unit.state = UnitState::Completed;
                debug!(
                    unit = %unit.key,
                    rows = outcome.rows_written,
                    from_cache = outcome.from_cache,
                    "unit completed"
                );
                self.emit(SyncEvent::Completed {
                    unit: unit.key,
                    from_cache: outcome.from_cache,
                });
                Ok(outcome)
            }
            // a journal failure under a dependency is a run problem, not
            // this unit's outcome
            Err(e @ Error::Journal(_)) => Err(e),
            Err(e) => {
                warn!(unit = %unit.key, phase = unit.state.as_str(), "unit failed: {}", e);
                unit.state = UnitState::Failed;
                self.journal.fail_unit(&entry, &e)?;
                self.emit(SyncEvent::Failed {
                    unit: unit.key,
                    message: e.to_string(),
                });
                Ok(UnitOutcome::failed(&e))
            }
        }
    }

    /// Walk one unit through Resolving, Fetching, Transforming, Committing.
    fn drive(&mut self, unit: &mut UnitOfWork) -> Result<UnitOutcome> {
        unit.state = UnitState::Resolving;

        // attached dependencies first; for a bare detail unit this is its
        // game, which settles finality before the unit's own document moves
        for dep in unit.deps.clone() {
            self.ensure_dependency(&unit.key, &dep)?;
        }

        // without a parent document the unit's own document is the only
        // place dependencies can come from, so it is acquired here and
        // reused in the Fetching phase
        let mut acquired: Option<Acquired> = None;
        if !unit.resolved {
            let own = self.acquire(&unit.key, unit.parent_final)?;
            for dep in resolver::resolve_dependencies(unit.key.kind, &own.document) {
                if !unit.deps.contains(&dep) {
                    self.ensure_dependency(&unit.key, &dep)?;
                    unit.deps.push(dep);
                }
            }
            acquired = Some(own);
        }

        unit.state = UnitState::Fetching;
        let acquired = match acquired {
            Some(own) => own,
            None => self.acquire(&unit.key, unit.parent_final)?,
        };

        unit.state = UnitState::Transforming;
        let rows = model::transform(unit.key.kind, unit.key.id, &acquired.document)?;

        unit.state = UnitState::Committing;
        let rows_written = self.store.apply_unit(&rows)?;

        unit.document = Some(acquired.document);
        Ok(UnitOutcome {
            state: UnitState::Completed,
            is_final: acquired.is_final,
            from_cache: acquired.from_cache,
            rows_written,
            error: None,
        })
    }

    /// Drive a dependency to a terminal state if this run has not already,
    /// then apply the dependency policy to its outcome.
    fn ensure_dependency(&mut self, dependent: &UnitKey, dep: &UnitKey) -> Result<()> {
        if let Some(existing) = self.outcomes.get(dep) {
            if existing.state == UnitState::Completed {
                return Ok(());
            }
            let message = existing.error.clone().unwrap_or_default();
            return self.dependency_failed(dependent, dep, message);
        }

        debug!(dependent = %dependent, dependency = %dep, "driving dependency");
        self.emit(SyncEvent::Discovered { count: 1 });
        let mut dep_unit = UnitOfWork::bare(*dep);
        let outcome = self.process_unit(&mut dep_unit)?;
        let succeeded = outcome.state == UnitState::Completed;
        let message = outcome.error.clone().unwrap_or_default();
        self.record(*dep, outcome);

        if succeeded {
            Ok(())
        } else {
            self.dependency_failed(dependent, dep, message)
        }
    }

    fn dependency_failed(
        &self,
        dependent: &UnitKey,
        dep: &UnitKey,
        message: String,
    ) -> Result<()> {
        match self.options.dependency_policy {
            DependencyPolicy::Strict => Err(Error::DependencyFailed {
                kind: dep.kind,
                id: dep.id,
                message,
            }),
            DependencyPolicy::Lenient => {
                warn!(
                    dependent = %dependent,
                    dependency = %dep,
                    "continuing past failed dependency; the commit may hit a foreign key"
                );
                Ok(())
            }
        }
    }

    fn record(&mut self, key: UnitKey, outcome: UnitOutcome) {
        if outcome.state != UnitState::Completed {
            self.failures
                .push((key, outcome.error.clone().unwrap_or_default()));
        }
        self.outcomes.insert(key, outcome);
    }

    // ========== Document Acquisition ==========

    /// Cache-or-fetch for one unit's document. Final documents are written
    /// through to the cache; anything already cached is left untouched.
    fn acquire(&mut self, key: &UnitKey, parent_final: Option<bool>) -> Result<Acquired> {
        let cacheable = key.kind.freshness() == Freshness::Cacheable;
        if cacheable && !self.options.force_refresh {
            if let Some(document) = self.cache.get(key) {
                // only final documents are ever stored
                return Ok(Acquired {
                    document,
                    is_final: true,
                    from_cache: true,
                });
            }
        }

        let document = self.client.fetch(key.kind, key.id)?;
        let is_final = match key.kind {
            UnitKind::Game => model::game::is_final(&document),
            UnitKind::Boxscore | UnitKind::PlayByPlay => {
                parent_final.unwrap_or_else(|| self.parent_game_final(key.id))
            }
            _ => false,
        };
        if cacheable && is_final && !self.cache.contains(key) {
            self.cache.put(key, &document)?;
        }
        Ok(Acquired {
            document,
            is_final,
            from_cache: false,
        })
    }

    /// Finality of a game already driven this run
    fn parent_game_final(&self, game_pk: i64) -> bool {
        self.outcomes
            .get(&UnitKey::new(UnitKind::Game, game_pk))
            .map(|outcome| outcome.is_final)
            .unwrap_or(false)
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(event);
        }
    }
}

/// Game units listed by a schedule document, dependencies attached from
/// each entry.
fn games_from_schedule(schedule: &Value) -> Result<Vec<UnitOfWork>> {
    let dates = schedule
        .get("dates")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Malformed("schedule has no dates array".to_string()))?;

    let mut units = Vec::new();
    for date in dates {
        let Some(games) = date.get("games").and_then(Value::as_array) else {
            continue;
        };
        for entry in games {
            let Some(pk) = entry.get("gamePk").and_then(Value::as_i64) else {
                warn!("skipping schedule entry without gamePk");
                continue;
            };
            let deps = resolver::resolve_dependencies(UnitKind::Game, entry);
            units.push(
                UnitOfWork::discovered(UnitKey::new(UnitKind::Game, pk), deps).with_cascade(),
            );
        }
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{endpoints, ClientConfig, ManualClock, ScriptedGateway, ScriptedReply};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    const PK: i64 = 745927;

    fn game_feed(pk: i64, state: &str) -> Value {
        json!({
            "gamePk": pk,
            "gameData": {
                "game": {"pk": pk, "type": "R", "season": "2024"},
                "datetime": {"dateTime": "2024-06-28T02:10:00Z", "officialDate": "2024-06-27"},
                "status": {"abstractGameState": state, "detailedState": state},
                "teams": {"away": {"id": 119}, "home": {"id": 137}},
                "venue": {"id": 2395},
                "players": {
                    "ID660271": {"id": 660271, "fullName": "Shohei Ohtani"},
                    "ID477132": {"id": 477132, "fullName": "Logan Webb"}
                }
            },
            "liveData": {"boxscore": {"officials": [
                {"official": {"id": 427058, "fullName": "Pat Hoberg"}, "officialType": "Home Plate"}
            ]}}
        })
    }

    fn boxscore_doc() -> Value {
        json!({
            "teams": {
                "away": {
                    "team": {"id": 119},
                    "players": {
                        "ID660271": {
                            "person": {"id": 660271},
                            "battingOrder": "100",
                            "stats": {"batting": {"atBats": 4, "hits": 2, "runs": 1}, "pitching": {}}
                        }
                    }
                },
                "home": {
                    "team": {"id": 137},
                    "players": {
                        "ID477132": {
                            "person": {"id": 477132},
                            "stats": {"batting": {}, "pitching": {"inningsPitched": "6.0", "strikeOuts": 7}},
                            "gameStatus": {"isStartingPitcher": true}
                        }
                    }
                }
            }
        })
    }

    fn play_by_play_doc() -> Value {
        json!({
            "allPlays": [{
                "result": {"event": "Single", "awayScore": 0, "homeScore": 0},
                "about": {"atBatIndex": 0, "halfInning": "top", "inning": 1},
                "count": {"balls": 0, "strikes": 1, "outs": 0},
                "matchup": {"batter": {"id": 660271}, "pitcher": {"id": 477132}},
                "playEvents": [
                    {"isPitch": true, "pitchNumber": 1,
                     "details": {"call": {"code": "S"}, "isStrike": true}}
                ]
            }]
        })
    }

    fn stub_teams(gateway: &ScriptedGateway) {
        let base = "http://test";
        gateway.stub_json(
            &endpoints::unit_url(base, UnitKind::Team, 119),
            json!({"teams": [{"id": 119, "name": "Los Angeles Dodgers"}]}),
        );
        gateway.stub_json(
            &endpoints::unit_url(base, UnitKind::Team, 137),
            json!({"teams": [{"id": 137, "name": "San Francisco Giants"}]}),
        );
    }

    fn stub_reference_data(gateway: &ScriptedGateway) {
        let base = "http://test";
        stub_teams(gateway);
        gateway.stub_json(
            &endpoints::unit_url(base, UnitKind::Venue, 2395),
            json!({"venues": [{"id": 2395, "name": "Oracle Park"}]}),
        );
        gateway.stub_json(
            &endpoints::unit_url(base, UnitKind::Player, 660271),
            json!({"people": [{"id": 660271, "fullName": "Shohei Ohtani"}]}),
        );
        gateway.stub_json(
            &endpoints::unit_url(base, UnitKind::Player, 477132),
            json!({"people": [{"id": 477132, "fullName": "Logan Webb"}]}),
        );
    }

    fn stub_detail_docs(gateway: &ScriptedGateway) {
        let base = "http://test";
        gateway.stub_json(&endpoints::unit_url(base, UnitKind::Boxscore, PK), boxscore_doc());
        gateway.stub_json(
            &endpoints::unit_url(base, UnitKind::PlayByPlay, PK),
            play_by_play_doc(),
        );
    }

    fn stub_game_tree(gateway: &ScriptedGateway, state: &str) {
        gateway.stub_json(
            &endpoints::unit_url("http://test", UnitKind::Game, PK),
            game_feed(PK, state),
        );
        stub_reference_data(gateway);
        stub_detail_docs(gateway);
    }

    fn orchestrator(
        gateway: &std::sync::Arc<ScriptedGateway>,
        dir: &TempDir,
        options: SyncOptions,
    ) -> Orchestrator<std::sync::Arc<ScriptedGateway>> {
        let config = ClientConfig::default()
            .with_base_url("http://test")
            .with_request_interval(Duration::ZERO);
        let client = StatsClient::with_clock(gateway.clone(), config, Box::new(ManualClock::new()));
        let db = dir.path().join("scorebook.db");
        let store = SqliteStore::open(&db).unwrap();
        let journal = SyncJournal::open(&db).unwrap();
        let cache = ResponseCache::new(dir.path().join("cache"));
        Orchestrator::new(client, cache, store, journal, options)
    }

    #[test]
    fn explicit_game_sync_commits_full_tree() {
        let gateway = std::sync::Arc::new(ScriptedGateway::new());
        stub_game_tree(&gateway, "Final");
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&gateway, &dir, SyncOptions::default());

        let report = orch.run(SyncPlan::Games(vec![PK])).unwrap();
        assert!(report.all_succeeded(), "failures: {:?}", report.failures);
        // game + 2 teams + venue + 2 players + boxscore + play-by-play
        assert_eq!(report.completed, 8);

        let stats = orch.store().stats().unwrap();
        assert_eq!(stats.games, 1);
        assert_eq!(stats.teams, 2);
        assert_eq!(stats.venues, 1);
        assert_eq!(stats.players, 2);
        assert_eq!(stats.batting_lines, 1);
        assert_eq!(stats.pitching_lines, 1);
        assert_eq!(stats.at_bats, 1);
        assert_eq!(stats.pitches, 1);

        // all three game documents were final, so all three were cached
        assert_eq!(orch.cache().entry_count(), 3);
        assert!(orch.journal().failed_units().unwrap().is_empty());
    }

    #[test]
    fn live_game_documents_are_not_cached() {
        let gateway = std::sync::Arc::new(ScriptedGateway::new());
        stub_game_tree(&gateway, "Live");
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&gateway, &dir, SyncOptions::default());

        let report = orch.run(SyncPlan::Games(vec![PK])).unwrap();
        assert!(report.all_succeeded());
        assert_eq!(orch.cache().entry_count(), 0);
    }

    #[test]
    fn failed_dependency_blocks_the_feed_fetch() {
        let gateway = std::sync::Arc::new(ScriptedGateway::new());
        stub_teams(&gateway);
        // venue permanently broken
        let venue_url = endpoints::unit_url("http://test", UnitKind::Venue, 2395);
        gateway.stub(&venue_url, ScriptedReply::Status(404));

        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&gateway, &dir, SyncOptions::default());

        let day = NaiveDate::from_ymd_opt(2024, 6, 27).unwrap();
        gateway.stub_json(
            &endpoints::schedule_url("http://test", day, day),
            json!({"dates": [{"date": "2024-06-27", "games": [{
                "gamePk": PK,
                "status": {"abstractGameState": "Final"},
                "teams": {"away": {"team": {"id": 119}}, "home": {"team": {"id": 137}}},
                "venue": {"id": 2395}
            }]}]}),
        );
        let report = orch
            .run(SyncPlan::Dates {
                ranges: vec![(day, day)],
            })
            .unwrap();

        // venue failed, game failed on the dependency; both teams made it
        assert_eq!(report.failed, 2);
        assert_eq!(report.completed, 2);
        // the game's own document was never requested
        let feed_url = endpoints::unit_url("http://test", UnitKind::Game, PK);
        assert_eq!(gateway.calls_for(&feed_url), 0);
        // and no children were attempted
        let box_url = endpoints::unit_url("http://test", UnitKind::Boxscore, PK);
        assert_eq!(gateway.calls_for(&box_url), 0);

        let failed = orch.journal().failed_units().unwrap();
        assert!(failed.contains(&UnitKey::new(UnitKind::Venue, 2395)));
        assert!(failed.contains(&UnitKey::new(UnitKind::Game, PK)));
    }

    #[test]
    fn lenient_policy_continues_past_unreferenced_player() {
        let gateway = std::sync::Arc::new(ScriptedGateway::new());
        stub_reference_data(&gateway);
        stub_detail_docs(&gateway);
        // roster lists a player whose lookup fails but who never appears in
        // any boxscore or play-by-play row
        let mut feed = game_feed(PK, "Final");
        feed["gameData"]["players"]["ID999999"] = json!({"id": 999999, "fullName": "Bench Guy"});
        gateway.stub(
            &endpoints::unit_url("http://test", UnitKind::Game, PK),
            ScriptedReply::Json(feed),
        );
        gateway.stub(
            &endpoints::unit_url("http://test", UnitKind::Player, 999999),
            ScriptedReply::Status(404),
        );

        let dir = TempDir::new().unwrap();
        let options = SyncOptions {
            dependency_policy: DependencyPolicy::Lenient,
            ..Default::default()
        };
        let mut orch = orchestrator(&gateway, &dir, options);

        let report = orch.run(SyncPlan::Games(vec![PK])).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 8);
        let stats = orch.store().stats().unwrap();
        assert_eq!(stats.batting_lines, 1);
        assert_eq!(stats.at_bats, 1);
    }

    #[test]
    fn cancelled_run_does_no_work() {
        let gateway = std::sync::Arc::new(ScriptedGateway::new());
        stub_game_tree(&gateway, "Final");
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&gateway, &dir, SyncOptions::default());

        orch.cancel_handle().store(true, Ordering::Relaxed);
        let report = orch.run(SyncPlan::Games(vec![PK])).unwrap();
        assert!(report.cancelled);
        assert!(!report.all_succeeded());
        assert_eq!(report.completed, 0);
        assert_eq!(report.failed, 0);
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn malformed_schedule_fails_the_run() {
        let gateway = std::sync::Arc::new(ScriptedGateway::new());
        let day = NaiveDate::from_ymd_opt(2024, 6, 27).unwrap();
        gateway.stub_json(
            &endpoints::schedule_url("http://test", day, day),
            json!({"unexpected": true}),
        );
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&gateway, &dir, SyncOptions::default());

        let err = orch
            .run(SyncPlan::Dates {
                ranges: vec![(day, day)],
            })
            .unwrap_err();
        assert_eq!(err.category(), "malformed");
    }

    #[test]
    fn journal_write_failure_aborts_the_run() {
        let gateway = std::sync::Arc::new(ScriptedGateway::new());
        stub_game_tree(&gateway, "Final");
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&gateway, &dir, SyncOptions::default());

        // make journal inserts fail, as a full disk would
        let saboteur = rusqlite::Connection::open(dir.path().join("scorebook.db")).unwrap();
        saboteur
            .execute_batch(
                "CREATE TRIGGER sync_journal_block BEFORE INSERT ON sync_journal
                 BEGIN SELECT RAISE(ABORT, 'journal unavailable'); END;",
            )
            .unwrap();

        let err = orch.run(SyncPlan::Games(vec![PK])).unwrap_err();
        assert_eq!(err.category(), "journal");
        // nothing was fetched or committed once the bookkeeping broke
        assert!(gateway.calls().is_empty());
        assert_eq!(orch.store().stats().unwrap().games, 0);
    }
}
