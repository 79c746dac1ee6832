//! SQLite storage implementation.
//!
//! All rows for one unit of work are applied inside a single transaction,
//! so a unit is either fully present or absent, never half-written. Keyed
//! rows use `ON CONFLICT DO UPDATE` rather than `INSERT OR REPLACE`: the
//! latter deletes the old row first, which under enforced foreign keys
//! would take a game's child rows down with it.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, Transaction};

use super::schema;
use crate::model::{
    AtBatRow, BattingLine, GameRow, OfficialRow, PitchRow, PitchingLine, PlayerRow, TeamRow,
    UnitRows, VenueRow,
};
use crate::Result;

/// SQLite-backed store for collected game data
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::setup(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup(conn)
    }

    fn setup(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA cache_size = -64000;",
        )?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create all tables and indexes, and stamp the meta table
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        self.set_meta("schema_version", schema::SCHEMA_VERSION)?;
        self.set_meta("app_version", env!("CARGO_PKG_VERSION"))?;
        Ok(())
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn meta_value(&self, key: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    // ========== Unit Commit ==========

    /// Apply every row of one unit in a single transaction. Returns the
    /// number of rows written.
    pub fn apply_unit(&mut self, rows: &UnitRows) -> Result<usize> {
        let written_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let count = match rows {
            UnitRows::Team(team) => {
                upsert_team(&tx, team, &written_at)?;
                1
            }
            UnitRows::Venue(venue) => {
                upsert_venue(&tx, venue, &written_at)?;
                1
            }
            UnitRows::Player(player) => {
                upsert_player(&tx, player, &written_at)?;
                1
            }
            UnitRows::Game { game, officials } => {
                upsert_game(&tx, game, &written_at)?;
                replace_officials(&tx, game.game_pk, officials)?;
                1 + officials.len()
            }
            UnitRows::Boxscore {
                game_pk,
                batting,
                pitching,
            } => {
                tx.execute("DELETE FROM game_batting WHERE game_pk = ?1", [game_pk])?;
                tx.execute("DELETE FROM game_pitching WHERE game_pk = ?1", [game_pk])?;
                for line in batting {
                    insert_batting_line(&tx, line)?;
                }
                for line in pitching {
                    insert_pitching_line(&tx, line)?;
                }
                batting.len() + pitching.len()
            }
            UnitRows::PlayByPlay {
                game_pk,
                at_bats,
                pitches,
            } => {
                // pitches reference at_bats, so they go first on delete
                // and last on insert
                tx.execute("DELETE FROM pitches WHERE game_pk = ?1", [game_pk])?;
                tx.execute("DELETE FROM at_bats WHERE game_pk = ?1", [game_pk])?;
                for at_bat in at_bats {
                    insert_at_bat(&tx, at_bat)?;
                }
                for pitch in pitches {
                    insert_pitch(&tx, pitch)?;
                }
                at_bats.len() + pitches.len()
            }
        };
        tx.commit()?;
        Ok(count)
    }

    // ========== Stats ==========

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            teams: self.count("teams")?,
            venues: self.count("venues")?,
            players: self.count("players")?,
            games: self.count("games")?,
            batting_lines: self.count("game_batting")?,
            pitching_lines: self.count("game_pitching")?,
            at_bats: self.count("at_bats")?,
            pitches: self.count("pitches")?,
        })
    }

    fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(Into::into)
    }
}

/// Row counts per table
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub teams: i64,
    pub venues: i64,
    pub players: i64,
    pub games: i64,
    pub batting_lines: i64,
    pub pitching_lines: i64,
    pub at_bats: i64,
    pub pitches: i64,
}

// ========== Row Writers ==========

fn upsert_team(tx: &Transaction<'_>, team: &TeamRow, written_at: &str) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO teams (id, name, abbreviation, team_code, team_name, location_name,
                           league_id, league_name, division_id, division_name,
                           active, written_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            abbreviation = excluded.abbreviation,
            team_code = excluded.team_code,
            team_name = excluded.team_name,
            location_name = excluded.location_name,
            league_id = excluded.league_id,
            league_name = excluded.league_name,
            division_id = excluded.division_id,
            division_name = excluded.division_name,
            active = excluded.active,
            written_at = excluded.written_at
        "#,
        params![
            team.id,
            team.name,
            team.abbreviation,
            team.team_code,
            team.team_name,
            team.location_name,
            team.league_id,
            team.league_name,
            team.division_id,
            team.division_name,
            team.active,
            written_at,
        ],
    )?;
    Ok(())
}

fn upsert_venue(tx: &Transaction<'_>, venue: &VenueRow, written_at: &str) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO venues (id, name, active, city, state, country,
                            latitude, longitude, elevation, tz_id, tz_offset,
                            capacity, turf_type, roof_type, written_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            active = excluded.active,
            city = excluded.city,
            state = excluded.state,
            country = excluded.country,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            elevation = excluded.elevation,
            tz_id = excluded.tz_id,
            tz_offset = excluded.tz_offset,
            capacity = excluded.capacity,
            turf_type = excluded.turf_type,
            roof_type = excluded.roof_type,
            written_at = excluded.written_at
        "#,
        params![
            venue.id,
            venue.name,
            venue.active,
            venue.city,
            venue.state,
            venue.country,
            venue.latitude,
            venue.longitude,
            venue.elevation,
            venue.tz_id,
            venue.tz_offset,
            venue.capacity,
            venue.turf_type,
            venue.roof_type,
            written_at,
        ],
    )?;
    Ok(())
}

fn upsert_player(tx: &Transaction<'_>, player: &PlayerRow, written_at: &str) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO players (id, full_name, first_name, last_name, primary_number,
                             birth_date, birth_country, height, weight, active,
                             position_code, position_name,
                             bat_side, pitch_hand, mlb_debut_date, current_team_id, written_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT(id) DO UPDATE SET
            full_name = excluded.full_name,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            primary_number = excluded.primary_number,
            birth_date = excluded.birth_date,
            birth_country = excluded.birth_country,
            height = excluded.height,
            weight = excluded.weight,
            active = excluded.active,
            position_code = excluded.position_code,
            position_name = excluded.position_name,
            bat_side = excluded.bat_side,
            pitch_hand = excluded.pitch_hand,
            mlb_debut_date = excluded.mlb_debut_date,
            current_team_id = excluded.current_team_id,
            written_at = excluded.written_at
        "#,
        params![
            player.id,
            player.full_name,
            player.first_name,
            player.last_name,
            player.primary_number,
            player.birth_date,
            player.birth_country,
            player.height,
            player.weight,
            player.active,
            player.position_code,
            player.position_name,
            player.bat_side,
            player.pitch_hand,
            player.mlb_debut_date,
            player.current_team_id,
            written_at,
        ],
    )?;
    Ok(())
}

fn upsert_game(tx: &Transaction<'_>, game: &GameRow, written_at: &str) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO games (game_pk, season, game_type, game_date, official_date,
                           abstract_state, detailed_state,
                           away_team_id, home_team_id, venue_id,
                           away_score, home_score, day_night, scheduled_innings, written_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(game_pk) DO UPDATE SET
            season = excluded.season,
            game_type = excluded.game_type,
            game_date = excluded.game_date,
            official_date = excluded.official_date,
            abstract_state = excluded.abstract_state,
            detailed_state = excluded.detailed_state,
            away_team_id = excluded.away_team_id,
            home_team_id = excluded.home_team_id,
            venue_id = excluded.venue_id,
            away_score = excluded.away_score,
            home_score = excluded.home_score,
            day_night = excluded.day_night,
            scheduled_innings = excluded.scheduled_innings,
            written_at = excluded.written_at
        "#,
        params![
            game.game_pk,
            game.season,
            game.game_type,
            game.game_date,
            game.official_date,
            game.abstract_state,
            game.detailed_state,
            game.away_team_id,
            game.home_team_id,
            game.venue_id,
            game.away_score,
            game.home_score,
            game.day_night,
            game.scheduled_innings,
            written_at,
        ],
    )?;
    Ok(())
}

fn replace_officials(
    tx: &Transaction<'_>,
    game_pk: i64,
    officials: &[OfficialRow],
) -> Result<()> {
    tx.execute("DELETE FROM game_officials WHERE game_pk = ?1", [game_pk])?;
    for official in officials {
        tx.execute(
            "INSERT INTO game_officials (game_pk, official_id, full_name, official_type)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                official.game_pk,
                official.official_id,
                official.full_name,
                official.official_type,
            ],
        )?;
    }
    Ok(())
}

fn insert_batting_line(tx: &Transaction<'_>, line: &BattingLine) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO game_batting (game_pk, player_id, team_id, batting_order,
                                  position_code, position_abbrev,
                                  at_bats, runs, hits, doubles, triples, home_runs,
                                  rbi, base_on_balls, strike_outs, hit_by_pitch,
                                  stolen_bases, left_on_base, total_bases, sac_flies)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
        "#,
        params![
            line.game_pk,
            line.player_id,
            line.team_id,
            line.batting_order,
            line.position_code,
            line.position_abbrev,
            line.at_bats,
            line.runs,
            line.hits,
            line.doubles,
            line.triples,
            line.home_runs,
            line.rbi,
            line.base_on_balls,
            line.strike_outs,
            line.hit_by_pitch,
            line.stolen_bases,
            line.left_on_base,
            line.total_bases,
            line.sac_flies,
        ],
    )?;
    Ok(())
}

fn insert_pitching_line(tx: &Transaction<'_>, line: &PitchingLine) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO game_pitching (game_pk, player_id, team_id, is_starting,
                                   innings_pitched, batters_faced, hits, runs,
                                   earned_runs, home_runs, base_on_balls, strike_outs,
                                   number_of_pitches, strikes, note)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
        params![
            line.game_pk,
            line.player_id,
            line.team_id,
            line.is_starting,
            line.innings_pitched,
            line.batters_faced,
            line.hits,
            line.runs,
            line.earned_runs,
            line.home_runs,
            line.base_on_balls,
            line.strike_outs,
            line.number_of_pitches,
            line.strikes,
            line.note,
        ],
    )?;
    Ok(())
}

fn insert_at_bat(tx: &Transaction<'_>, at_bat: &AtBatRow) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO at_bats (game_pk, at_bat_index, inning, half_inning,
                             batter_id, pitcher_id, event, event_type,
                             description, rbi, away_score, home_score,
                             balls, strikes, outs, start_time, end_time)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
        params![
            at_bat.game_pk,
            at_bat.at_bat_index,
            at_bat.inning,
            at_bat.half_inning,
            at_bat.batter_id,
            at_bat.pitcher_id,
            at_bat.event,
            at_bat.event_type,
            at_bat.description,
            at_bat.rbi,
            at_bat.away_score,
            at_bat.home_score,
            at_bat.balls,
            at_bat.strikes,
            at_bat.outs,
            at_bat.start_time,
            at_bat.end_time,
        ],
    )?;
    Ok(())
}

fn insert_pitch(tx: &Transaction<'_>, pitch: &PitchRow) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO pitches (game_pk, at_bat_index, pitch_number, play_id,
                             call_code, call_description, pitch_type_code, pitch_type_description,
                             is_in_play, is_strike, is_ball, balls, strikes,
                             start_speed, end_speed, zone, plate_x, plate_z,
                             spin_rate, spin_direction, extension,
                             launch_speed, launch_angle, total_distance, trajectory)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)
        "#,
        params![
            pitch.game_pk,
            pitch.at_bat_index,
            pitch.pitch_number,
            pitch.play_id,
            pitch.call_code,
            pitch.call_description,
            pitch.pitch_type_code,
            pitch.pitch_type_description,
            pitch.is_in_play,
            pitch.is_strike,
            pitch.is_ball,
            pitch.balls,
            pitch.strikes,
            pitch.start_speed,
            pitch.end_speed,
            pitch.zone,
            pitch.plate_x,
            pitch.plate_z,
            pitch.spin_rate,
            pitch.spin_direction,
            pitch.extension,
            pitch.launch_speed,
            pitch.launch_angle,
            pitch.total_distance,
            pitch.trajectory,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: i64, name: &str) -> TeamRow {
        TeamRow {
            id,
            name: name.to_string(),
            abbreviation: None,
            team_code: None,
            team_name: None,
            location_name: None,
            league_id: None,
            league_name: None,
            division_id: None,
            division_name: None,
            active: true,
        }
    }

    fn player(id: i64, name: &str) -> PlayerRow {
        PlayerRow {
            id,
            full_name: name.to_string(),
            first_name: None,
            last_name: None,
            primary_number: None,
            birth_date: None,
            birth_country: None,
            height: None,
            weight: None,
            active: true,
            position_code: None,
            position_name: None,
            bat_side: None,
            pitch_hand: None,
            mlb_debut_date: None,
            current_team_id: None,
        }
    }

    fn game(game_pk: i64) -> GameRow {
        GameRow {
            game_pk,
            season: Some("2024".to_string()),
            game_type: Some("R".to_string()),
            game_date: None,
            official_date: Some("2024-06-27".to_string()),
            abstract_state: Some("Final".to_string()),
            detailed_state: Some("Final".to_string()),
            away_team_id: 119,
            home_team_id: 137,
            venue_id: None,
            away_score: Some(5),
            home_score: Some(3),
            day_night: None,
            scheduled_innings: Some(9),
        }
    }

    fn store_with_reference_data() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.apply_unit(&UnitRows::Team(team(119, "Los Angeles Dodgers"))).unwrap();
        store.apply_unit(&UnitRows::Team(team(137, "San Francisco Giants"))).unwrap();
        store.apply_unit(&UnitRows::Player(player(660271, "Shohei Ohtani"))).unwrap();
        store
    }

    #[test]
    fn reapplying_a_unit_does_not_duplicate_rows() {
        let mut store = store_with_reference_data();
        store.apply_unit(&UnitRows::Team(team(119, "Los Angeles Dodgers"))).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.teams, 2);
    }

    #[test]
    fn game_upsert_preserves_officials_replacement() {
        let mut store = store_with_reference_data();
        let officials = vec![OfficialRow {
            game_pk: 1,
            official_id: Some(427058),
            full_name: Some("Pat Hoberg".to_string()),
            official_type: "Home Plate".to_string(),
        }];
        let written = store
            .apply_unit(&UnitRows::Game {
                game: game(1),
                officials: officials.clone(),
            })
            .unwrap();
        assert_eq!(written, 2);

        // second apply replaces rather than appends
        store
            .apply_unit(&UnitRows::Game {
                game: game(1),
                officials,
            })
            .unwrap();
        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM game_officials", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn game_without_teams_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .apply_unit(&UnitRows::Game {
                game: game(1),
                officials: vec![],
            })
            .unwrap_err();
        assert_eq!(err.category(), "storage");
        let stats = store.stats().unwrap();
        assert_eq!(stats.games, 0);
    }

    #[test]
    fn failed_unit_rolls_back_completely() {
        let mut store = store_with_reference_data();
        store
            .apply_unit(&UnitRows::Game {
                game: game(1),
                officials: vec![],
            })
            .unwrap();

        let good_line = BattingLine {
            game_pk: 1,
            player_id: 660271,
            team_id: Some(119),
            batting_order: Some(100),
            position_code: None,
            position_abbrev: None,
            at_bats: Some(4),
            runs: Some(1),
            hits: Some(2),
            doubles: None,
            triples: None,
            home_runs: Some(1),
            rbi: Some(1),
            base_on_balls: None,
            strike_outs: None,
            hit_by_pitch: None,
            stolen_bases: None,
            left_on_base: None,
            total_bases: None,
            sac_flies: None,
        };
        store
            .apply_unit(&UnitRows::Boxscore {
                game_pk: 1,
                batting: vec![good_line.clone()],
                pitching: vec![],
            })
            .unwrap();

        // second boxscore has a line for a player that was never synced
        let mut bad_line = good_line;
        bad_line.player_id = 999999;
        let err = store
            .apply_unit(&UnitRows::Boxscore {
                game_pk: 1,
                batting: vec![bad_line],
                pitching: vec![],
            })
            .unwrap_err();
        assert_eq!(err.category(), "storage");

        // the rollback kept the previously committed line intact
        let stats = store.stats().unwrap();
        assert_eq!(stats.batting_lines, 1);
    }

    #[test]
    fn play_by_play_reapply_replaces_children() {
        let mut store = store_with_reference_data();
        store
            .apply_unit(&UnitRows::Game {
                game: game(1),
                officials: vec![],
            })
            .unwrap();

        let at_bat = AtBatRow {
            game_pk: 1,
            at_bat_index: 0,
            inning: Some(1),
            half_inning: Some("top".to_string()),
            batter_id: Some(660271),
            pitcher_id: None,
            event: Some("Home Run".to_string()),
            event_type: None,
            description: None,
            rbi: Some(1),
            away_score: Some(1),
            home_score: Some(0),
            balls: None,
            strikes: None,
            outs: None,
            start_time: None,
            end_time: None,
        };
        let pitch = PitchRow {
            game_pk: 1,
            at_bat_index: 0,
            pitch_number: 1,
            play_id: None,
            call_code: Some("B".to_string()),
            call_description: None,
            pitch_type_code: None,
            pitch_type_description: None,
            is_in_play: Some(false),
            is_strike: Some(false),
            is_ball: Some(true),
            balls: Some(1),
            strikes: Some(0),
            start_speed: Some(94.8),
            end_speed: None,
            zone: None,
            plate_x: None,
            plate_z: None,
            spin_rate: None,
            spin_direction: None,
            extension: None,
            launch_speed: None,
            launch_angle: None,
            total_distance: None,
            trajectory: None,
        };
        let unit = UnitRows::PlayByPlay {
            game_pk: 1,
            at_bats: vec![at_bat],
            pitches: vec![pitch],
        };
        assert_eq!(store.apply_unit(&unit).unwrap(), 2);
        assert_eq!(store.apply_unit(&unit).unwrap(), 2);

        let stats = store.stats().unwrap();
        assert_eq!(stats.at_bats, 1);
        assert_eq!(stats.pitches, 1);
    }

    #[test]
    fn meta_records_schema_version() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(
            store.meta_value("schema_version").unwrap().as_deref(),
            Some(schema::SCHEMA_VERSION)
        );
        assert!(store.meta_value("app_version").unwrap().is_some());
    }
}
