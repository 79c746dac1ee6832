//! Durable record of unit sync attempts.
//!
//! The journal writes through its own connection so a Started record is on
//! disk before any data rows for the unit are touched. If the process dies
//! mid-unit, the dangling Started record is all the evidence the next run
//! needs: anything whose latest record is not Completed is offered up for
//! `--retry-failed`. Records are never rewritten once finalized; a retry
//! appends a fresh record under a new run.

use crate::storage::schema;
use crate::sync::unit::{UnitKey, UnitKind};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub struct SyncJournal {
    conn: Connection,
}

/// Handle for one in-flight unit record
#[derive(Debug)]
pub struct JournalEntry {
    id: i64,
    key: UnitKey,
}

/// One non-completed journal record, newest first in listings
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub run_id: i64,
    pub key: UnitKey,
    pub status: String,
    pub started_at: String,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

/// Journal IO surfaces as a journal error, not a storage error: the
/// orchestrator aborts the run on it instead of failing the one unit.
fn db_err(e: rusqlite::Error) -> Error {
    Error::Journal(e.to_string())
}

impl SyncJournal {
    /// Open the journal on the given database file, creating its table if
    /// needed. This is a second connection to the same file the store uses;
    /// WAL mode keeps the two from blocking each other.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::setup(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::setup(conn)
    }

    fn setup(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(db_err)?;
        for statement in schema::journal_statements() {
            conn.execute(statement, []).map_err(db_err)?;
        }
        Ok(Self { conn })
    }

    /// Allocate the next run id
    pub fn begin_run(&self) -> Result<i64> {
        let next: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(run_id), 0) + 1 FROM sync_journal",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(next)
    }

    /// Record that work on a unit has started. Committed immediately, so a
    /// crash between here and the unit's data transaction leaves the
    /// tell-tale Started record behind.
    pub fn begin_unit(&self, run_id: i64, key: &UnitKey) -> Result<JournalEntry> {
        self.conn
            .execute(
                "INSERT INTO sync_journal (run_id, kind, external_id, status, started_at)
                 VALUES (?1, ?2, ?3, 'started', ?4)",
                params![run_id, key.kind.as_str(), key.id, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        let id = self.conn.last_insert_rowid();
        debug!(unit = %key, run_id, "journal: started");
        Ok(JournalEntry { id, key: key.clone() })
    }

    /// Finalize a record as completed. Each record is finalized exactly
    /// once; a second finalization is a bug and fails.
    pub fn complete_unit(&self, entry: &JournalEntry, rows_written: usize) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE sync_journal
                 SET status = 'completed', finished_at = ?1, rows_written = ?2
                 WHERE id = ?3 AND status = 'started'",
                params![Utc::now().to_rfc3339(), rows_written as i64, entry.id],
            )
            .map_err(db_err)?;
        if updated != 1 {
            return Err(Error::Journal(format!(
                "record for {} was already finalized",
                entry.key
            )));
        }
        debug!(unit = %entry.key, rows_written, "journal: completed");
        Ok(())
    }

    /// Finalize a record as failed, capturing the error's category and text
    pub fn fail_unit(&self, entry: &JournalEntry, error: &Error) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE sync_journal
                 SET status = 'failed', finished_at = ?1, error_kind = ?2, error_message = ?3
                 WHERE id = ?4 AND status = 'started'",
                params![
                    Utc::now().to_rfc3339(),
                    error.category(),
                    error.to_string(),
                    entry.id
                ],
            )
            .map_err(db_err)?;
        if updated != 1 {
            return Err(Error::Journal(format!(
                "record for {} was already finalized",
                entry.key
            )));
        }
        debug!(unit = %entry.key, "journal: failed");
        Ok(())
    }

    /// Units whose most recent record is not Completed. Covers explicit
    /// failures and interrupted runs alike, since a crash leaves the latest
    /// record in Started.
    pub fn failed_units(&self) -> Result<Vec<UnitKey>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT j.kind, j.external_id FROM sync_journal j
                 WHERE j.id = (
                     SELECT MAX(id) FROM sync_journal
                     WHERE kind = j.kind AND external_id = j.external_id
                 )
                 AND j.status != 'completed'
                 ORDER BY j.id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(db_err)?;
        let mut units = Vec::new();
        for row in rows {
            let (kind, id) = row.map_err(db_err)?;
            let kind = UnitKind::from_str(&kind)
                .map_err(|_| Error::Journal(format!("unknown unit kind in journal: {}", kind)))?;
            units.push(UnitKey::new(kind, id));
        }
        Ok(units)
    }

    /// Most recent non-completed records, for the `failed` listing
    pub fn recent_failures(&self, limit: usize) -> Result<Vec<FailureRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT run_id, kind, external_id, status, started_at, error_kind, error_message
                 FROM sync_journal
                 WHERE status != 'completed'
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })
            .map_err(db_err)?;
        let mut records = Vec::new();
        for row in rows {
            let (run_id, kind, id, status, started_at, error_kind, error_message) =
                row.map_err(db_err)?;
            let kind = UnitKind::from_str(&kind)
                .map_err(|_| Error::Journal(format!("unknown unit kind in journal: {}", kind)))?;
            records.push(FailureRecord {
                run_id,
                key: UnitKey::new(kind, id),
                status,
                started_at,
                error_kind,
                error_message,
            });
        }
        Ok(records)
    }

    /// Completed / failed / started counts over the whole journal
    pub fn status_counts(&self) -> Result<(i64, i64, i64)> {
        let count = |status: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM sync_journal WHERE status = ?1",
                    params![status],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?
                .unwrap_or(0))
        };
        Ok((count("completed")?, count("failed")?, count("started")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> SyncJournal {
        SyncJournal::open_in_memory().unwrap()
    }

    #[test]
    fn run_ids_increase() {
        let journal = journal();
        let run = journal.begin_run().unwrap();
        assert_eq!(run, 1);
        let entry = journal
            .begin_unit(run, &UnitKey::new(UnitKind::Game, 1))
            .unwrap();
        journal.complete_unit(&entry, 10).unwrap();
        assert_eq!(journal.begin_run().unwrap(), 2);
    }

    #[test]
    fn completed_unit_is_not_offered_for_retry() {
        let journal = journal();
        let key = UnitKey::new(UnitKind::Game, 745927);
        let entry = journal.begin_unit(1, &key).unwrap();
        journal.complete_unit(&entry, 42).unwrap();
        assert!(journal.failed_units().unwrap().is_empty());
    }

    #[test]
    fn failed_unit_is_offered_for_retry() {
        let journal = journal();
        let key = UnitKey::new(UnitKind::Boxscore, 745927);
        let entry = journal.begin_unit(1, &key).unwrap();
        journal
            .fail_unit(
                &entry,
                &Error::Transient {
                    url: "http://test".to_string(),
                    message: "HTTP 503".to_string(),
                },
            )
            .unwrap();
        assert_eq!(journal.failed_units().unwrap(), vec![key]);
    }

    #[test]
    fn dangling_started_counts_as_failed() {
        let journal = journal();
        let key = UnitKey::new(UnitKind::Game, 7);
        // begin and never finalize, as a crash would
        journal.begin_unit(1, &key).unwrap();
        assert_eq!(journal.failed_units().unwrap(), vec![key]);
    }

    #[test]
    fn later_success_clears_earlier_failure() {
        let journal = journal();
        let key = UnitKey::new(UnitKind::Game, 7);
        let first = journal.begin_unit(1, &key).unwrap();
        journal
            .fail_unit(&first, &Error::Malformed("missing gamePk".to_string()))
            .unwrap();
        let second = journal.begin_unit(2, &key).unwrap();
        journal.complete_unit(&second, 5).unwrap();
        assert!(journal.failed_units().unwrap().is_empty());
    }

    #[test]
    fn journal_io_failures_carry_the_journal_category() {
        let journal = journal();
        journal.conn.execute_batch("DROP TABLE sync_journal").unwrap();
        let err = journal
            .begin_unit(1, &UnitKey::new(UnitKind::Game, 1))
            .unwrap_err();
        assert_eq!(err.category(), "journal");
    }

    #[test]
    fn double_finalize_is_an_error() {
        let journal = journal();
        let entry = journal
            .begin_unit(1, &UnitKey::new(UnitKind::Team, 119))
            .unwrap();
        journal.complete_unit(&entry, 1).unwrap();
        let err = journal.complete_unit(&entry, 1).unwrap_err();
        assert_eq!(err.category(), "journal");
    }

    #[test]
    fn recent_failures_are_newest_first() {
        let journal = journal();
        let a = journal
            .begin_unit(1, &UnitKey::new(UnitKind::Game, 1))
            .unwrap();
        journal
            .fail_unit(&a, &Error::Malformed("bad".to_string()))
            .unwrap();
        let b = journal
            .begin_unit(1, &UnitKey::new(UnitKind::Game, 2))
            .unwrap();
        journal
            .fail_unit(&b, &Error::Malformed("worse".to_string()))
            .unwrap();

        let failures = journal.recent_failures(10).unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].key, UnitKey::new(UnitKind::Game, 2));
        assert_eq!(failures[0].error_kind.as_deref(), Some("malformed"));
    }
}
