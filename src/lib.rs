//! # Scorebook - MLB Stats API collector
//!
//! Incremental sync of MLB Stats API data into a local SQLite database.
//!
//! Scorebook provides:
//! - A rate-limited, retrying API client with a pluggable HTTP gateway
//! - An immutable on-disk cache for responses of completed (Final) games
//! - A sync orchestrator that drives each unit of work through a small
//!   state machine, resolving cross-entity dependencies first
//! - A sync journal recording per-unit outcomes, so failed or interrupted
//!   work can be retried
//! - SQLite-backed storage with idempotent upserts and per-unit transactions

pub mod api;
pub mod cache;
pub mod config;
pub mod dates;
pub mod journal;
pub mod model;
pub mod resolver;
pub mod storage;
pub mod sync;
pub mod ui;

// Re-exports for convenient access
pub use api::StatsClient;
pub use cache::ResponseCache;
pub use journal::SyncJournal;
pub use storage::SqliteStore;
pub use sync::{Orchestrator, SyncPlan};
pub use sync::unit::UnitKind;

/// Result type alias for Scorebook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Scorebook operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Retryable fetch failure: timeout, connection error, 429, 5xx
    #[error("Transient fetch failure for {url}: {message}")]
    Transient { url: String, message: String },

    /// Non-retryable fetch failure: other 4xx, or a body that is not JSON
    #[error("Permanent fetch failure for {url}: {message}")]
    Permanent {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Document is missing fields required to build rows
    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Cache misuse or cache IO failure; a double put lands here
    #[error("Cache error: {0}")]
    Cache(String),

    /// Journal bookkeeping violation, e.g. finalizing a record twice
    #[error("Journal error: {0}")]
    Journal(String),

    /// A required dependency unit ended Failed under strict policy
    #[error("Dependency {kind} {id} failed: {message}")]
    DependencyFailed {
        kind: sync::unit::UnitKind,
        id: i64,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the fetcher should retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }

    /// Short category name recorded in the journal's error_kind column
    pub fn category(&self) -> &'static str {
        match self {
            Error::Transient { .. } => "transient",
            Error::Permanent { .. } => "permanent",
            Error::Malformed(_) => "malformed",
            Error::Storage(_) => "storage",
            Error::Cache(_) => "cache",
            Error::Journal(_) => "journal",
            Error::DependencyFailed { .. } => "dependency",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
        }
    }
}
