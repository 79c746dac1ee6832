//! Pure dependency extraction from API documents.
//!
//! Given a document and the kind of unit it backs, produce the reference
//! units that must exist in the database before that unit's rows can be
//! committed. No I/O happens here; handing the same document in twice
//! yields the same list twice.
//!
//! Ordering is load order: teams, then venues, then players, each group
//! sorted by id with duplicates removed. Game rows carry foreign keys into
//! teams and venues; batting, pitching and play rows carry foreign keys
//! into players.

use crate::sync::unit::{UnitKey, UnitKind};
use serde_json::Value;
use std::collections::BTreeSet;

/// Reference units a document depends on
pub fn resolve_dependencies(kind: UnitKind, document: &Value) -> Vec<UnitKey> {
    let mut teams = BTreeSet::new();
    let mut venues = BTreeSet::new();
    let mut players = BTreeSet::new();

    match kind {
        UnitKind::Team | UnitKind::Venue | UnitKind::Player => {}
        UnitKind::Game => {
            collect_game_refs(document, &mut teams, &mut venues);
        }
        UnitKind::Boxscore | UnitKind::PlayByPlay => {
            collect_player_refs(document, &mut players);
        }
    }

    let mut deps = Vec::with_capacity(teams.len() + venues.len() + players.len());
    deps.extend(teams.into_iter().map(|id| UnitKey::new(UnitKind::Team, id)));
    deps.extend(venues.into_iter().map(|id| UnitKey::new(UnitKind::Venue, id)));
    deps.extend(
        players
            .into_iter()
            .map(|id| UnitKey::new(UnitKind::Player, id)),
    );
    deps
}

/// Team and venue ids for a game, from either a schedule entry
/// (`teams.away.team.id`, `venue.id`) or a live feed
/// (`gameData.teams.away.id`, `gameData.venue.id`).
fn collect_game_refs(document: &Value, teams: &mut BTreeSet<i64>, venues: &mut BTreeSet<i64>) {
    for side in ["away", "home"] {
        for pointer in [
            format!("/teams/{}/team/id", side),
            format!("/gameData/teams/{}/id", side),
        ] {
            if let Some(id) = document.pointer(&pointer).and_then(Value::as_i64) {
                teams.insert(id);
            }
        }
    }
    for pointer in ["/venue/id", "/gameData/venue/id"] {
        if let Some(id) = document.pointer(pointer).and_then(Value::as_i64) {
            venues.insert(id);
        }
    }
}

/// Player ids appearing in a game's detail documents. Understands three
/// shapes: the live feed's `gameData.players` map, a standalone boxscore's
/// per-side `players` maps, and a standalone play-by-play's at-bat matchups.
fn collect_player_refs(document: &Value, players: &mut BTreeSet<i64>) {
    if let Some(map) = document
        .pointer("/gameData/players")
        .and_then(Value::as_object)
    {
        for person in map.values() {
            if let Some(id) = person.get("id").and_then(Value::as_i64) {
                players.insert(id);
            }
        }
        return;
    }

    let mut found_boxscore = false;
    for side in ["away", "home"] {
        let pointer = format!("/teams/{}/players", side);
        if let Some(map) = document.pointer(&pointer).and_then(Value::as_object) {
            found_boxscore = true;
            for entry in map.values() {
                if let Some(id) = entry.pointer("/person/id").and_then(Value::as_i64) {
                    players.insert(id);
                }
            }
        }
    }
    if found_boxscore {
        return;
    }

    if let Some(plays) = document.get("allPlays").and_then(Value::as_array) {
        for play in plays {
            for role in ["batter", "pitcher"] {
                let pointer = format!("/matchup/{}/id", role);
                if let Some(id) = play.pointer(&pointer).and_then(Value::as_i64) {
                    players.insert(id);
                }
            }
        }
    }
}
