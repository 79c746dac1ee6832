//! Unit-of-work types
//!
//! Everything the orchestrator syncs is a unit: one entity identified by
//! `(UnitKind, external id)`. Teams, venues and players are leaf reference
//! entities; games, boxscores and play-by-play are per-game documents keyed
//! by gamePk.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// The six kinds of syncable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Team reference data keyed by MLB teamId
    Team,
    /// Venue reference data keyed by MLB venueId
    Venue,
    /// Player reference data keyed by MLB personId
    Player,
    /// Game live feed keyed by gamePk
    Game,
    /// Per-game batting and pitching lines keyed by gamePk
    Boxscore,
    /// Per-game at-bats and pitches keyed by gamePk
    PlayByPlay,
}

impl UnitKind {
    /// Get the string representation of the unit kind
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Team => "team",
            UnitKind::Venue => "venue",
            UnitKind::Player => "player",
            UnitKind::Game => "game",
            UnitKind::Boxscore => "boxscore",
            UnitKind::PlayByPlay => "play_by_play",
        }
    }

    /// Get all unit kinds
    pub fn all() -> &'static [UnitKind] {
        &[
            UnitKind::Team,
            UnitKind::Venue,
            UnitKind::Player,
            UnitKind::Game,
            UnitKind::Boxscore,
            UnitKind::PlayByPlay,
        ]
    }

    /// Freshness policy for documents of this kind
    pub fn freshness(&self) -> Freshness {
        match self {
            UnitKind::Team | UnitKind::Venue | UnitKind::Player => Freshness::AlwaysFresh,
            UnitKind::Game | UnitKind::Boxscore | UnitKind::PlayByPlay => Freshness::Cacheable,
        }
    }

    /// Leaf kinds have no dependencies of their own
    pub fn is_leaf(&self) -> bool {
        matches!(self, UnitKind::Team | UnitKind::Venue | UnitKind::Player)
    }
}

impl FromStr for UnitKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "team" | "teams" => Ok(UnitKind::Team),
            "venue" | "venues" => Ok(UnitKind::Venue),
            "player" | "players" | "person" => Ok(UnitKind::Player),
            "game" | "games" | "feed" => Ok(UnitKind::Game),
            "boxscore" | "box" => Ok(UnitKind::Boxscore),
            "play_by_play" | "playbyplay" | "pbp" => Ok(UnitKind::PlayByPlay),
            _ => Err(Error::Config(format!("Unknown unit kind: {}", s))),
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a document of a kind may be served from the immutable cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fetch from the network every run
    AlwaysFresh,
    /// Serve from cache when a final copy exists
    Cacheable,
}

/// Identity of a unit: kind plus external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    pub kind: UnitKind,
    pub id: i64,
}

impl UnitKey {
    pub fn new(kind: UnitKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// States a unit moves through while being processed.
///
/// `Failed` is reachable from any active state; `Completed` only from
/// `Committing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Resolving,
    Fetching,
    Transforming,
    Committing,
    Completed,
    Failed,
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Completed | UnitState::Failed)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, UnitState::Pending) && !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Pending => "pending",
            UnitState::Resolving => "resolving",
            UnitState::Fetching => "fetching",
            UnitState::Transforming => "transforming",
            UnitState::Committing => "committing",
            UnitState::Completed => "completed",
            UnitState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One schedulable piece of sync work.
#[derive(Debug)]
pub struct UnitOfWork {
    pub key: UnitKey,
    /// Where this unit currently is in its lifecycle
    pub state: UnitState,
    /// Dependency units to drive to a terminal state before fetching
    pub deps: Vec<UnitKey>,
    /// When false, the unit's own document must be fetched to discover
    /// further dependencies (retry and explicit-id entry paths)
    pub resolved: bool,
    /// Document already acquired during resolution, if any
    pub document: Option<Value>,
    /// Finality inherited from the parent game feed, for cache writes of
    /// documents that carry no status of their own
    pub parent_final: Option<bool>,
    /// Whether completing this game should discover its boxscore and
    /// play-by-play children
    pub cascade: bool,
}

impl UnitOfWork {
    /// A unit with dependencies already known from the document that
    /// discovered it.
    pub fn discovered(key: UnitKey, deps: Vec<UnitKey>) -> Self {
        Self {
            key,
            state: UnitState::Pending,
            deps,
            resolved: true,
            document: None,
            parent_final: None,
            cascade: false,
        }
    }

    /// A unit seeded only by its identity; non-leaf kinds will resolve
    /// dependencies from their own document. Boxscore and play-by-play
    /// units always depend on their game row being present first.
    pub fn bare(key: UnitKey) -> Self {
        let deps = match key.kind {
            UnitKind::Boxscore | UnitKind::PlayByPlay => {
                vec![UnitKey::new(UnitKind::Game, key.id)]
            }
            _ => Vec::new(),
        };
        Self {
            key,
            state: UnitState::Pending,
            deps,
            resolved: key.kind.is_leaf(),
            document: None,
            parent_final: None,
            cascade: false,
        }
    }

    pub fn with_cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    pub fn with_parent_final(mut self, is_final: bool) -> Self {
        self.parent_final = Some(is_final);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in UnitKind::all() {
            let parsed: UnitKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
    }

    #[test]
    fn kind_accepts_aliases() {
        assert_eq!("pbp".parse::<UnitKind>().unwrap(), UnitKind::PlayByPlay);
        assert_eq!("teams".parse::<UnitKind>().unwrap(), UnitKind::Team);
        assert!("inning".parse::<UnitKind>().is_err());
    }

    #[test]
    fn reference_kinds_are_always_fresh() {
        assert_eq!(UnitKind::Team.freshness(), Freshness::AlwaysFresh);
        assert_eq!(UnitKind::Venue.freshness(), Freshness::AlwaysFresh);
        assert_eq!(UnitKind::Player.freshness(), Freshness::AlwaysFresh);
        assert_eq!(UnitKind::Game.freshness(), Freshness::Cacheable);
        assert_eq!(UnitKind::Boxscore.freshness(), Freshness::Cacheable);
        assert_eq!(UnitKind::PlayByPlay.freshness(), Freshness::Cacheable);
    }

    #[test]
    fn state_terminality() {
        assert!(UnitState::Completed.is_terminal());
        assert!(UnitState::Failed.is_terminal());
        assert!(!UnitState::Fetching.is_terminal());
        assert!(UnitState::Fetching.is_active());
        assert!(!UnitState::Pending.is_active());
    }

    #[test]
    fn bare_boxscore_depends_on_its_game() {
        let unit = UnitOfWork::bare(UnitKey::new(UnitKind::Boxscore, 745927));
        assert_eq!(unit.deps, vec![UnitKey::new(UnitKind::Game, 745927)]);
        assert!(!unit.resolved);
        assert_eq!(unit.state, UnitState::Pending);
    }

    #[test]
    fn bare_leaf_is_resolved() {
        let unit = UnitOfWork::bare(UnitKey::new(UnitKind::Team, 119));
        assert!(unit.deps.is_empty());
        assert!(unit.resolved);
    }
}
