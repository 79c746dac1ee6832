//! Player document transform

use super::{bool_at, i64_at, require_i64, require_str, str_at};
use crate::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub id: i64,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub primary_number: Option<String>,
    pub birth_date: Option<String>,
    pub birth_country: Option<String>,
    pub height: Option<String>,
    pub weight: Option<i64>,
    pub active: bool,
    pub position_code: Option<String>,
    pub position_name: Option<String>,
    pub bat_side: Option<String>,
    pub pitch_hand: Option<String>,
    pub mlb_debut_date: Option<String>,
    pub current_team_id: Option<i64>,
}

/// Pick one player row out of a `/people/{id}` response
pub fn transform_player(id: i64, document: &Value) -> Result<PlayerRow> {
    let person = document
        .pointer("/people/0")
        .ok_or_else(|| Error::Malformed("player document has no people entry".to_string()))?;
    let found = require_i64(person, "/id", "player id")?;
    if found != id {
        return Err(Error::Malformed(format!(
            "player document is for id {}, expected {}",
            found, id
        )));
    }
    Ok(PlayerRow {
        id,
        full_name: require_str(person, "/fullName", "player fullName")?,
        first_name: str_at(person, "/firstName"),
        last_name: str_at(person, "/lastName"),
        primary_number: str_at(person, "/primaryNumber"),
        birth_date: str_at(person, "/birthDate"),
        birth_country: str_at(person, "/birthCountry"),
        height: str_at(person, "/height"),
        weight: i64_at(person, "/weight"),
        active: bool_at(person, "/active").unwrap_or(true),
        position_code: str_at(person, "/primaryPosition/code"),
        position_name: str_at(person, "/primaryPosition/name"),
        bat_side: str_at(person, "/batSide/code"),
        pitch_hand: str_at(person, "/pitchHand/code"),
        mlb_debut_date: str_at(person, "/mlbDebutDate"),
        current_team_id: i64_at(person, "/currentTeam/id"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transforms_full_document() {
        let doc = json!({
            "people": [{
                "id": 660271,
                "fullName": "Shohei Ohtani",
                "firstName": "Shohei",
                "lastName": "Ohtani",
                "primaryNumber": "17",
                "birthDate": "1994-07-05",
                "birthCountry": "Japan",
                "height": "6' 4\"",
                "weight": 210,
                "active": true,
                "primaryPosition": {"code": "Y", "name": "Two-Way Player", "abbreviation": "TWP"},
                "batSide": {"code": "L"},
                "pitchHand": {"code": "R"},
                "mlbDebutDate": "2018-03-29",
                "currentTeam": {"id": 119}
            }]
        });
        let row = transform_player(660271, &doc).unwrap();
        assert_eq!(row.full_name, "Shohei Ohtani");
        assert_eq!(row.primary_number.as_deref(), Some("17"));
        assert_eq!(row.position_name.as_deref(), Some("Two-Way Player"));
        assert_eq!(row.bat_side.as_deref(), Some("L"));
        assert_eq!(row.current_team_id, Some(119));
    }

    #[test]
    fn empty_people_array_is_malformed() {
        let err = transform_player(660271, &json!({"people": []})).unwrap_err();
        assert_eq!(err.category(), "malformed");
    }

    #[test]
    fn id_mismatch_is_malformed() {
        let doc = json!({"people": [{"id": 1, "fullName": "Somebody Else"}]});
        let err = transform_player(660271, &doc).unwrap_err();
        assert_eq!(err.category(), "malformed");
    }
}
