//! Transformation of raw API documents into database rows.
//!
//! Each unit kind has a transform that picks the fields the schema keeps
//! out of the (much larger) API response. Transforms are pure: no I/O, no
//! clock, and a missing essential field is a malformed-data error rather
//! than a guess.

pub mod boxscore;
pub mod game;
pub mod play;
pub mod player;
pub mod team;
pub mod venue;

pub use boxscore::{BattingLine, PitchingLine};
pub use game::{GameRow, OfficialRow};
pub use play::{AtBatRow, PitchRow};
pub use player::PlayerRow;
pub use team::TeamRow;
pub use venue::VenueRow;

use crate::sync::unit::UnitKind;
use crate::{Error, Result};
use serde_json::Value;

/// Rows produced by transforming one unit's document
#[derive(Debug, Clone, PartialEq)]
pub enum UnitRows {
    Team(TeamRow),
    Venue(VenueRow),
    Player(PlayerRow),
    Game {
        game: GameRow,
        officials: Vec<OfficialRow>,
    },
    Boxscore {
        game_pk: i64,
        batting: Vec<BattingLine>,
        pitching: Vec<PitchingLine>,
    },
    PlayByPlay {
        game_pk: i64,
        at_bats: Vec<AtBatRow>,
        pitches: Vec<PitchRow>,
    },
}

impl UnitRows {
    pub fn row_count(&self) -> usize {
        match self {
            UnitRows::Team(_) | UnitRows::Venue(_) | UnitRows::Player(_) => 1,
            UnitRows::Game { officials, .. } => 1 + officials.len(),
            UnitRows::Boxscore {
                batting, pitching, ..
            } => batting.len() + pitching.len(),
            UnitRows::PlayByPlay {
                at_bats, pitches, ..
            } => at_bats.len() + pitches.len(),
        }
    }
}

/// Transform the document backing `kind`/`id` into its rows
pub fn transform(kind: UnitKind, id: i64, document: &Value) -> Result<UnitRows> {
    match kind {
        UnitKind::Team => Ok(UnitRows::Team(team::transform_team(id, document)?)),
        UnitKind::Venue => Ok(UnitRows::Venue(venue::transform_venue(id, document)?)),
        UnitKind::Player => Ok(UnitRows::Player(player::transform_player(id, document)?)),
        UnitKind::Game => {
            let (game, officials) = game::transform_game(id, document)?;
            Ok(UnitRows::Game { game, officials })
        }
        UnitKind::Boxscore => {
            let (batting, pitching) = boxscore::transform_boxscore(id, document)?;
            Ok(UnitRows::Boxscore {
                game_pk: id,
                batting,
                pitching,
            })
        }
        UnitKind::PlayByPlay => {
            let (at_bats, pitches) = play::transform_play_by_play(id, document)?;
            Ok(UnitRows::PlayByPlay {
                game_pk: id,
                at_bats,
                pitches,
            })
        }
    }
}

// Pointer helpers shared by the per-kind transforms

pub(crate) fn str_at(document: &Value, pointer: &str) -> Option<String> {
    document
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn i64_at(document: &Value, pointer: &str) -> Option<i64> {
    document.pointer(pointer).and_then(Value::as_i64)
}

pub(crate) fn f64_at(document: &Value, pointer: &str) -> Option<f64> {
    document.pointer(pointer).and_then(Value::as_f64)
}

pub(crate) fn bool_at(document: &Value, pointer: &str) -> Option<bool> {
    document.pointer(pointer).and_then(Value::as_bool)
}

pub(crate) fn require_i64(document: &Value, pointer: &str, what: &str) -> Result<i64> {
    i64_at(document, pointer).ok_or_else(|| Error::Malformed(format!("missing {}", what)))
}

pub(crate) fn require_str(document: &Value, pointer: &str, what: &str) -> Result<String> {
    str_at(document, pointer).ok_or_else(|| Error::Malformed(format!("missing {}", what)))
}
