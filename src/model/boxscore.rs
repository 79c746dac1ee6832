//! Boxscore transform: per-player batting and pitching lines.
//!
//! The boxscore endpoint keys players as `"ID<person id>"` under each
//! side's `players` map. A player gets a batting line when their batting
//! stats object is non-empty, a pitching line when their pitching stats
//! object is non-empty; two-way players get both.

use super::{bool_at, i64_at, str_at};
use crate::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct BattingLine {
    pub game_pk: i64,
    pub player_id: i64,
    pub team_id: Option<i64>,
    pub batting_order: Option<i64>,
    pub position_code: Option<String>,
    pub position_abbrev: Option<String>,
    pub at_bats: Option<i64>,
    pub runs: Option<i64>,
    pub hits: Option<i64>,
    pub doubles: Option<i64>,
    pub triples: Option<i64>,
    pub home_runs: Option<i64>,
    pub rbi: Option<i64>,
    pub base_on_balls: Option<i64>,
    pub strike_outs: Option<i64>,
    pub hit_by_pitch: Option<i64>,
    pub stolen_bases: Option<i64>,
    pub left_on_base: Option<i64>,
    pub total_bases: Option<i64>,
    pub sac_flies: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchingLine {
    pub game_pk: i64,
    pub player_id: i64,
    pub team_id: Option<i64>,
    pub is_starting: bool,
    pub innings_pitched: Option<String>,
    pub batters_faced: Option<i64>,
    pub hits: Option<i64>,
    pub runs: Option<i64>,
    pub earned_runs: Option<i64>,
    pub home_runs: Option<i64>,
    pub base_on_balls: Option<i64>,
    pub strike_outs: Option<i64>,
    pub number_of_pitches: Option<i64>,
    pub strikes: Option<i64>,
    pub note: Option<String>,
}

/// Batting and pitching lines out of a `/game/{pk}/boxscore` response
pub fn transform_boxscore(
    game_pk: i64,
    document: &Value,
) -> Result<(Vec<BattingLine>, Vec<PitchingLine>)> {
    let teams = document
        .get("teams")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::Malformed("boxscore has no teams object".to_string()))?;

    let mut batting = Vec::new();
    let mut pitching = Vec::new();

    for side in ["away", "home"] {
        let Some(team) = teams.get(side) else {
            continue;
        };
        let team_id = i64_at(team, "/team/id");
        let Some(players) = team.get("players").and_then(Value::as_object) else {
            continue;
        };
        for entry in players.values() {
            let Some(player_id) = i64_at(entry, "/person/id") else {
                continue;
            };
            if let Some(stats) = non_empty_stats(entry, "batting") {
                batting.push(BattingLine {
                    game_pk,
                    player_id,
                    team_id,
                    // battingOrder is a string like "100"
                    batting_order: str_at(entry, "/battingOrder")
                        .and_then(|o| o.parse::<i64>().ok()),
                    position_code: str_at(entry, "/position/code"),
                    position_abbrev: str_at(entry, "/position/abbreviation"),
                    at_bats: i64_at(stats, "/atBats"),
                    runs: i64_at(stats, "/runs"),
                    hits: i64_at(stats, "/hits"),
                    doubles: i64_at(stats, "/doubles"),
                    triples: i64_at(stats, "/triples"),
                    home_runs: i64_at(stats, "/homeRuns"),
                    rbi: i64_at(stats, "/rbi"),
                    base_on_balls: i64_at(stats, "/baseOnBalls"),
                    strike_outs: i64_at(stats, "/strikeOuts"),
                    hit_by_pitch: i64_at(stats, "/hitByPitch"),
                    stolen_bases: i64_at(stats, "/stolenBases"),
                    left_on_base: i64_at(stats, "/leftOnBase"),
                    total_bases: i64_at(stats, "/totalBases"),
                    sac_flies: i64_at(stats, "/sacFlies"),
                });
            }
            if let Some(stats) = non_empty_stats(entry, "pitching") {
                pitching.push(PitchingLine {
                    game_pk,
                    player_id,
                    team_id,
                    is_starting: bool_at(entry, "/gameStatus/isStartingPitcher")
                        .unwrap_or(false),
                    innings_pitched: str_at(stats, "/inningsPitched"),
                    batters_faced: i64_at(stats, "/battersFaced"),
                    hits: i64_at(stats, "/hits"),
                    runs: i64_at(stats, "/runs"),
                    earned_runs: i64_at(stats, "/earnedRuns"),
                    home_runs: i64_at(stats, "/homeRuns"),
                    base_on_balls: i64_at(stats, "/baseOnBalls"),
                    strike_outs: i64_at(stats, "/strikeOuts"),
                    number_of_pitches: i64_at(stats, "/numberOfPitches"),
                    strikes: i64_at(stats, "/strikes"),
                    note: str_at(stats, "/note"),
                });
            }
        }
    }

    batting.sort_by_key(|line| line.player_id);
    pitching.sort_by_key(|line| line.player_id);
    Ok((batting, pitching))
}

fn non_empty_stats<'a>(entry: &'a Value, group: &str) -> Option<&'a Value> {
    let stats = entry.pointer(&format!("/stats/{}", group))?;
    match stats.as_object() {
        Some(map) if !map.is_empty() => Some(stats),
        _ => None,
    }
}
