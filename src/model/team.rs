//! Team document transform

use super::{bool_at, i64_at, require_i64, require_str, str_at};
use crate::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRow {
    pub id: i64,
    pub name: String,
    pub abbreviation: Option<String>,
    pub team_code: Option<String>,
    pub team_name: Option<String>,
    pub location_name: Option<String>,
    pub league_id: Option<i64>,
    pub league_name: Option<String>,
    pub division_id: Option<i64>,
    pub division_name: Option<String>,
    pub active: bool,
}

/// Pick one team row out of a `/teams/{id}` response (`{"teams": [...]}`)
pub fn transform_team(id: i64, document: &Value) -> Result<TeamRow> {
    let team = document
        .pointer("/teams/0")
        .ok_or_else(|| Error::Malformed("team document has no teams entry".to_string()))?;
    let found = require_i64(team, "/id", "team id")?;
    if found != id {
        return Err(Error::Malformed(format!(
            "team document is for id {}, expected {}",
            found, id
        )));
    }
    Ok(TeamRow {
        id,
        name: require_str(team, "/name", "team name")?,
        abbreviation: str_at(team, "/abbreviation"),
        team_code: str_at(team, "/teamCode"),
        team_name: str_at(team, "/teamName"),
        location_name: str_at(team, "/locationName"),
        league_id: i64_at(team, "/league/id"),
        league_name: str_at(team, "/league/name"),
        division_id: i64_at(team, "/division/id"),
        division_name: str_at(team, "/division/name"),
        active: bool_at(team, "/active").unwrap_or(true),
    })
}
