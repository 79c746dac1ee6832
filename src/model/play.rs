//! Play-by-play transform: at-bats and their pitch events.
//!
//! Every entry in `allPlays` becomes an at-bat row keyed by
//! `(game_pk, atBatIndex)`. Within a play, only events flagged `isPitch`
//! become pitch rows; pickoffs, mound visits and substitutions are skipped.
//! Pitch tracking data (`pitchData`, `hitData`) is optional throughout,
//! since Statcast coverage starts mid-2015 and has holes even after.

use super::{bool_at, f64_at, i64_at, str_at};
use crate::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct AtBatRow {
    pub game_pk: i64,
    pub at_bat_index: i64,
    pub inning: Option<i64>,
    pub half_inning: Option<String>,
    pub batter_id: Option<i64>,
    pub pitcher_id: Option<i64>,
    pub event: Option<String>,
    pub event_type: Option<String>,
    pub description: Option<String>,
    pub rbi: Option<i64>,
    pub away_score: Option<i64>,
    pub home_score: Option<i64>,
    pub balls: Option<i64>,
    pub strikes: Option<i64>,
    pub outs: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchRow {
    pub game_pk: i64,
    pub at_bat_index: i64,
    pub pitch_number: i64,
    pub play_id: Option<String>,
    pub call_code: Option<String>,
    pub call_description: Option<String>,
    pub pitch_type_code: Option<String>,
    pub pitch_type_description: Option<String>,
    pub is_in_play: Option<bool>,
    pub is_strike: Option<bool>,
    pub is_ball: Option<bool>,
    pub balls: Option<i64>,
    pub strikes: Option<i64>,
    pub start_speed: Option<f64>,
    pub end_speed: Option<f64>,
    pub zone: Option<i64>,
    pub plate_x: Option<f64>,
    pub plate_z: Option<f64>,
    pub spin_rate: Option<i64>,
    pub spin_direction: Option<i64>,
    pub extension: Option<f64>,
    pub launch_speed: Option<f64>,
    pub launch_angle: Option<f64>,
    pub total_distance: Option<f64>,
    pub trajectory: Option<String>,
}

/// At-bat and pitch rows out of a `/game/{pk}/playByPlay` response
pub fn transform_play_by_play(
    game_pk: i64,
    document: &Value,
) -> Result<(Vec<AtBatRow>, Vec<PitchRow>)> {
    let plays = document
        .get("allPlays")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Malformed("play-by-play has no allPlays array".to_string()))?;

    let mut at_bats = Vec::with_capacity(plays.len());
    let mut pitches = Vec::new();

    for play in plays {
        let at_bat_index = i64_at(play, "/about/atBatIndex").ok_or_else(|| {
            Error::Malformed("play entry has no about.atBatIndex".to_string())
        })?;

        at_bats.push(AtBatRow {
            game_pk,
            at_bat_index,
            inning: i64_at(play, "/about/inning"),
            half_inning: str_at(play, "/about/halfInning"),
            batter_id: i64_at(play, "/matchup/batter/id"),
            pitcher_id: i64_at(play, "/matchup/pitcher/id"),
            event: str_at(play, "/result/event"),
            event_type: str_at(play, "/result/eventType"),
            description: str_at(play, "/result/description"),
            rbi: i64_at(play, "/result/rbi"),
            away_score: i64_at(play, "/result/awayScore"),
            home_score: i64_at(play, "/result/homeScore"),
            balls: i64_at(play, "/count/balls"),
            strikes: i64_at(play, "/count/strikes"),
            outs: i64_at(play, "/count/outs"),
            start_time: str_at(play, "/about/startTime"),
            end_time: str_at(play, "/about/endTime"),
        });

        let Some(events) = play.get("playEvents").and_then(Value::as_array) else {
            continue;
        };
        for event in events {
            if !bool_at(event, "/isPitch").unwrap_or(false) {
                continue;
            }
            let Some(pitch_number) = i64_at(event, "/pitchNumber") else {
                continue;
            };
            pitches.push(PitchRow {
                game_pk,
                at_bat_index,
                pitch_number,
                play_id: str_at(event, "/playId"),
                call_code: str_at(event, "/details/call/code"),
                call_description: str_at(event, "/details/call/description"),
                pitch_type_code: str_at(event, "/details/type/code"),
                pitch_type_description: str_at(event, "/details/type/description"),
                is_in_play: bool_at(event, "/details/isInPlay"),
                is_strike: bool_at(event, "/details/isStrike"),
                is_ball: bool_at(event, "/details/isBall"),
                balls: i64_at(event, "/count/balls"),
                strikes: i64_at(event, "/count/strikes"),
                start_speed: f64_at(event, "/pitchData/startSpeed"),
                end_speed: f64_at(event, "/pitchData/endSpeed"),
                zone: i64_at(event, "/pitchData/zone"),
                plate_x: f64_at(event, "/pitchData/coordinates/pX"),
                plate_z: f64_at(event, "/pitchData/coordinates/pZ"),
                spin_rate: i64_at(event, "/pitchData/breaks/spinRate"),
                spin_direction: i64_at(event, "/pitchData/breaks/spinDirection"),
                extension: f64_at(event, "/pitchData/extension"),
                launch_speed: f64_at(event, "/hitData/launchSpeed"),
                launch_angle: f64_at(event, "/hitData/launchAngle"),
                total_distance: f64_at(event, "/hitData/totalDistance"),
                trajectory: str_at(event, "/hitData/trajectory"),
            });
        }
    }

    Ok((at_bats, pitches))
}
