//! Game feed transform.
//!
//! The live feed is the authoritative game document. Besides the game row
//! itself it carries the umpire crew under `liveData.boxscore.officials`,
//! and its `gameData.status.abstractGameState` is what decides whether the
//! response may enter the immutable cache.

use super::{i64_at, require_i64, str_at};
use crate::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct GameRow {
    pub game_pk: i64,
    pub season: Option<String>,
    pub game_type: Option<String>,
    pub game_date: Option<String>,
    pub official_date: Option<String>,
    pub abstract_state: Option<String>,
    pub detailed_state: Option<String>,
    pub away_team_id: i64,
    pub home_team_id: i64,
    pub venue_id: Option<i64>,
    pub away_score: Option<i64>,
    pub home_score: Option<i64>,
    pub day_night: Option<String>,
    pub scheduled_innings: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfficialRow {
    pub game_pk: i64,
    pub official_id: Option<i64>,
    pub full_name: Option<String>,
    pub official_type: String,
}

/// Whether a live feed describes a finished game
pub fn is_final(document: &Value) -> bool {
    document
        .pointer("/gameData/status/abstractGameState")
        .and_then(Value::as_str)
        == Some("Final")
}

/// Game row plus officials out of a `/game/{pk}/feed/live` response
pub fn transform_game(game_pk: i64, document: &Value) -> Result<(GameRow, Vec<OfficialRow>)> {
    let found = i64_at(document, "/gamePk")
        .or_else(|| i64_at(document, "/gameData/game/pk"))
        .ok_or_else(|| Error::Malformed("game feed has no gamePk".to_string()))?;
    if found != game_pk {
        return Err(Error::Malformed(format!(
            "game feed is for gamePk {}, expected {}",
            found, game_pk
        )));
    }

    let game = GameRow {
        game_pk,
        season: str_at(document, "/gameData/game/season"),
        game_type: str_at(document, "/gameData/game/type"),
        game_date: str_at(document, "/gameData/datetime/dateTime"),
        official_date: str_at(document, "/gameData/datetime/officialDate"),
        abstract_state: str_at(document, "/gameData/status/abstractGameState"),
        detailed_state: str_at(document, "/gameData/status/detailedState"),
        away_team_id: require_i64(document, "/gameData/teams/away/id", "away team id")?,
        home_team_id: require_i64(document, "/gameData/teams/home/id", "home team id")?,
        venue_id: i64_at(document, "/gameData/venue/id"),
        away_score: i64_at(document, "/liveData/linescore/teams/away/runs"),
        home_score: i64_at(document, "/liveData/linescore/teams/home/runs"),
        day_night: str_at(document, "/gameData/datetime/dayNight"),
        scheduled_innings: i64_at(document, "/gameData/game/scheduledInnings"),
    };

    // feeds for older seasons sometimes omit the crew
    let mut officials = Vec::new();
    if let Some(crew) = document
        .pointer("/liveData/boxscore/officials")
        .and_then(Value::as_array)
    {
        for member in crew {
            let Some(official_type) = str_at(member, "/officialType") else {
                continue;
            };
            officials.push(OfficialRow {
                game_pk,
                official_id: i64_at(member, "/official/id"),
                full_name: str_at(member, "/official/fullName"),
                official_type,
            });
        }
    }

    Ok((game, officials))
}
