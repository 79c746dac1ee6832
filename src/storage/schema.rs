//! SQLite schema definitions for the scorebook database

/// Current schema version, stored in the meta table
pub const SCHEMA_VERSION: &str = "1";

pub const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

pub const CREATE_TEAMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    abbreviation TEXT,
    team_code TEXT,
    team_name TEXT,
    location_name TEXT,
    league_id INTEGER,
    league_name TEXT,
    division_id INTEGER,
    division_name TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    written_at TEXT NOT NULL
)
"#;

pub const CREATE_VENUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS venues (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    city TEXT,
    state TEXT,
    country TEXT,
    latitude REAL,
    longitude REAL,
    elevation INTEGER,
    tz_id TEXT,
    tz_offset INTEGER,
    capacity INTEGER,
    turf_type TEXT,
    roof_type TEXT,
    written_at TEXT NOT NULL
)
"#;

pub const CREATE_PLAYERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    primary_number TEXT,
    birth_date TEXT,
    birth_country TEXT,
    height TEXT,
    weight INTEGER,
    active INTEGER NOT NULL DEFAULT 1,
    position_code TEXT,
    position_name TEXT,
    bat_side TEXT,
    pitch_hand TEXT,
    mlb_debut_date TEXT,
    current_team_id INTEGER,
    written_at TEXT NOT NULL
)
"#;

pub const CREATE_GAMES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    game_pk INTEGER PRIMARY KEY,
    season TEXT,
    game_type TEXT,
    game_date TEXT,
    official_date TEXT,
    abstract_state TEXT,
    detailed_state TEXT,
    away_team_id INTEGER NOT NULL REFERENCES teams(id),
    home_team_id INTEGER NOT NULL REFERENCES teams(id),
    venue_id INTEGER REFERENCES venues(id),
    away_score INTEGER,
    home_score INTEGER,
    day_night TEXT,
    scheduled_innings INTEGER,
    written_at TEXT NOT NULL
)
"#;

pub const CREATE_GAME_OFFICIALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS game_officials (
    game_pk INTEGER NOT NULL REFERENCES games(game_pk),
    official_id INTEGER,
    full_name TEXT,
    official_type TEXT NOT NULL,
    PRIMARY KEY (game_pk, official_type)
)
"#;

pub const CREATE_GAME_BATTING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS game_batting (
    game_pk INTEGER NOT NULL REFERENCES games(game_pk),
    player_id INTEGER NOT NULL REFERENCES players(id),
    team_id INTEGER REFERENCES teams(id),
    batting_order INTEGER,
    position_code TEXT,
    position_abbrev TEXT,
    at_bats INTEGER,
    runs INTEGER,
    hits INTEGER,
    doubles INTEGER,
    triples INTEGER,
    home_runs INTEGER,
    rbi INTEGER,
    base_on_balls INTEGER,
    strike_outs INTEGER,
    hit_by_pitch INTEGER,
    stolen_bases INTEGER,
    left_on_base INTEGER,
    total_bases INTEGER,
    sac_flies INTEGER,
    PRIMARY KEY (game_pk, player_id)
)
"#;

pub const CREATE_GAME_PITCHING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS game_pitching (
    game_pk INTEGER NOT NULL REFERENCES games(game_pk),
    player_id INTEGER NOT NULL REFERENCES players(id),
    team_id INTEGER REFERENCES teams(id),
    is_starting INTEGER,
    innings_pitched TEXT,
    batters_faced INTEGER,
    hits INTEGER,
    runs INTEGER,
    earned_runs INTEGER,
    home_runs INTEGER,
    base_on_balls INTEGER,
    strike_outs INTEGER,
    number_of_pitches INTEGER,
    strikes INTEGER,
    note TEXT,
    PRIMARY KEY (game_pk, player_id)
)
"#;

pub const CREATE_AT_BATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS at_bats (
    game_pk INTEGER NOT NULL REFERENCES games(game_pk),
    at_bat_index INTEGER NOT NULL,
    inning INTEGER,
    half_inning TEXT,
    batter_id INTEGER REFERENCES players(id),
    pitcher_id INTEGER REFERENCES players(id),
    event TEXT,
    event_type TEXT,
    description TEXT,
    rbi INTEGER,
    away_score INTEGER,
    home_score INTEGER,
    balls INTEGER,
    strikes INTEGER,
    outs INTEGER,
    start_time TEXT,
    end_time TEXT,
    PRIMARY KEY (game_pk, at_bat_index)
)
"#;

pub const CREATE_PITCHES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pitches (
    game_pk INTEGER NOT NULL,
    at_bat_index INTEGER NOT NULL,
    pitch_number INTEGER NOT NULL,
    play_id TEXT,
    call_code TEXT,
    call_description TEXT,
    pitch_type_code TEXT,
    pitch_type_description TEXT,
    is_in_play INTEGER,
    is_strike INTEGER,
    is_ball INTEGER,
    balls INTEGER,
    strikes INTEGER,
    start_speed REAL,
    end_speed REAL,
    zone INTEGER,
    plate_x REAL,
    plate_z REAL,
    spin_rate INTEGER,
    spin_direction INTEGER,
    extension REAL,
    launch_speed REAL,
    launch_angle REAL,
    total_distance REAL,
    trajectory TEXT,
    PRIMARY KEY (game_pk, at_bat_index, pitch_number),
    FOREIGN KEY (game_pk, at_bat_index) REFERENCES at_bats(game_pk, at_bat_index)
)
"#;

pub const CREATE_SYNC_JOURNAL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sync_journal (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    external_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    error_kind TEXT,
    error_message TEXT,
    rows_written INTEGER
)
"#;

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_games_season ON games(season)",
    "CREATE INDEX IF NOT EXISTS idx_games_date ON games(official_date)",
    "CREATE INDEX IF NOT EXISTS idx_at_bats_batter ON at_bats(batter_id)",
    "CREATE INDEX IF NOT EXISTS idx_at_bats_pitcher ON at_bats(pitcher_id)",
    "CREATE INDEX IF NOT EXISTS idx_pitches_game ON pitches(game_pk)",
];

pub const JOURNAL_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_journal_unit ON sync_journal(kind, external_id)",
    "CREATE INDEX IF NOT EXISTS idx_journal_run ON sync_journal(run_id)",
    "CREATE INDEX IF NOT EXISTS idx_journal_status ON sync_journal(status)",
];

/// Statements the journal needs, runnable on its own connection
pub fn journal_statements() -> Vec<&'static str> {
    let mut statements = vec![CREATE_SYNC_JOURNAL_TABLE];
    statements.extend(JOURNAL_INDEXES);
    statements
}

/// Every statement needed to build a fresh database
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut statements = vec![
        CREATE_META_TABLE,
        CREATE_TEAMS_TABLE,
        CREATE_VENUES_TABLE,
        CREATE_PLAYERS_TABLE,
        CREATE_GAMES_TABLE,
        CREATE_GAME_OFFICIALS_TABLE,
        CREATE_GAME_BATTING_TABLE,
        CREATE_GAME_PITCHING_TABLE,
        CREATE_AT_BATS_TABLE,
        CREATE_PITCHES_TABLE,
        CREATE_SYNC_JOURNAL_TABLE,
    ];
    statements.extend(CREATE_INDEXES);
    statements.extend(JOURNAL_INDEXES);
    statements
}
