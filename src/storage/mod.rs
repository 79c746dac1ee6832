//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - teams, venues, players (reference data, keyed by MLB ids)
//! - games, game_officials (one row per game plus its umpire crew)
//! - game_batting, game_pitching (boxscore lines per player per game)
//! - at_bats, pitches (play-by-play detail)
//! - sync_journal (attempt history, written through its own connection)

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, StoreStats};
