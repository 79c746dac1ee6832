//! Venue document transform

use super::{bool_at, f64_at, i64_at, require_i64, require_str, str_at};
use crate::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct VenueRow {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<i64>,
    pub tz_id: Option<String>,
    pub tz_offset: Option<i64>,
    pub capacity: Option<i64>,
    pub turf_type: Option<String>,
    pub roof_type: Option<String>,
}

/// Pick one venue row out of a hydrated `/venues/{id}` response
pub fn transform_venue(id: i64, document: &Value) -> Result<VenueRow> {
    let venue = document
        .pointer("/venues/0")
        .ok_or_else(|| Error::Malformed("venue document has no venues entry".to_string()))?;
    let found = require_i64(venue, "/id", "venue id")?;
    if found != id {
        return Err(Error::Malformed(format!(
            "venue document is for id {}, expected {}",
            found, id
        )));
    }
    Ok(VenueRow {
        id,
        name: require_str(venue, "/name", "venue name")?,
        active: bool_at(venue, "/active").unwrap_or(true),
        city: str_at(venue, "/location/city"),
        state: str_at(venue, "/location/state"),
        country: str_at(venue, "/location/country"),
        latitude: f64_at(venue, "/location/defaultCoordinates/latitude"),
        longitude: f64_at(venue, "/location/defaultCoordinates/longitude"),
        elevation: i64_at(venue, "/location/elevation"),
        tz_id: str_at(venue, "/timeZone/id"),
        tz_offset: i64_at(venue, "/timeZone/offset"),
        capacity: i64_at(venue, "/fieldInfo/capacity"),
        turf_type: str_at(venue, "/fieldInfo/turfType"),
        roof_type: str_at(venue, "/fieldInfo/roofType"),
    })
}
