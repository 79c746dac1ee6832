//! MLB Stats API endpoint URLs

use crate::sync::unit::UnitKind;
use chrono::NaiveDate;

/// Production API root
pub const BASE_URL: &str = "https://statsapi.mlb.com/api";

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// URL for the document backing a single unit
pub fn unit_url(base: &str, kind: UnitKind, id: i64) -> String {
    let path = match kind {
        UnitKind::Team => format!("v1/teams/{}", id),
        UnitKind::Venue => format!("v1/venues/{}?hydrate=location,fieldInfo,timezone", id),
        UnitKind::Player => format!("v1/people/{}", id),
        UnitKind::Game => format!("v1.1/game/{}/feed/live", id),
        UnitKind::Boxscore => format!("v1/game/{}/boxscore", id),
        UnitKind::PlayByPlay => format!("v1/game/{}/playByPlay", id),
    };
    join(base, &path)
}

/// URL for the schedule listing over an inclusive date range
pub fn schedule_url(base: &str, start: NaiveDate, end: NaiveDate) -> String {
    join(
        base,
        &format!(
            "v1/schedule?sportId=1&startDate={}&endDate={}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        ),
    )
}
