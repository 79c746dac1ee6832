//! Optional TOML configuration file.
//!
//! Command-line flags always win; the config file fills in whatever they
//! leave unset. A missing file is fine and yields all defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ClientConfig, RetryPolicy};
use crate::sync::DependencyPolicy;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScorebookConfig {
    pub sync: SyncSection,
    pub paths: PathsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Minimum milliseconds between API request starts
    pub request_interval_ms: u64,
    /// HTTP calls per document before a transient failure sticks
    pub max_attempts: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// "strict" fails dependents of failed units; "lenient" lets them try
    pub dependency_policy: String,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            request_interval_ms: 500,
            max_attempts: 3,
            timeout_secs: 30,
            dependency_policy: "strict".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PathsSection {
    pub database: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl ScorebookConfig {
    /// Client settings implied by the sync section
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_interval: Duration::from_millis(self.sync.request_interval_ms),
            timeout: Duration::from_secs(self.sync.timeout_secs),
            retry: RetryPolicy {
                max_attempts: self.sync.max_attempts,
                ..RetryPolicy::default()
            },
            ..ClientConfig::default()
        }
    }

    pub fn dependency_policy(&self) -> Result<DependencyPolicy> {
        match self.sync.dependency_policy.as_str() {
            "strict" => Ok(DependencyPolicy::Strict),
            "lenient" => Ok(DependencyPolicy::Lenient),
            other => Err(Error::Config(format!(
                "unknown dependency_policy '{}', expected strict or lenient",
                other
            ))),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("scorebook.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ScorebookConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ScorebookConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
