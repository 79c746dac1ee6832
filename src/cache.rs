//! Immutable on-disk cache for final API responses.
//!
//! Layout is one JSON file per unit: `<root>/<kind>/<id>.json`. Only
//! documents describing finished games belong here, so an existing entry is
//! never rewritten. A second `put` for the same key is a logic error
//! upstream and fails loudly instead of clobbering the stored document.

use crate::sync::unit::UnitKey;
use crate::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct ResponseCache {
    root: PathBuf,
}

impl ResponseCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &UnitKey) -> PathBuf {
        self.root
            .join(key.kind.as_str())
            .join(format!("{}.json", key.id))
    }

    /// Look up a cached document. An unreadable or corrupt entry logs a
    /// warning and reads as a miss; the network path takes over from there.
    pub fn get(&self, key: &UnitKey) -> Option<Value> {
        let path = self.entry_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), "unreadable cache entry, treating as miss: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => {
                debug!(unit = %key, "cache hit");
                Some(doc)
            }
            Err(e) => {
                warn!(path = %path.display(), "corrupt cache entry, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store a final document. Fails if the key already has an entry.
    pub fn put(&self, key: &UnitKey, document: &Value) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            return Err(Error::Cache(format!(
                "refusing to overwrite cached entry for {}",
                key
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // write to a sibling temp file first so a crash never leaves a
        // truncated entry behind
        let tmp = path.with_extension("json.tmp");
        let serialized = serde_json::to_string(document)
            .map_err(|e| Error::Cache(format!("failed to serialize entry for {}: {}", key, e)))?;
        fs::write(&tmp, serialized.as_bytes())?;
        fs::rename(&tmp, &path)?;
        debug!(unit = %key, path = %path.display(), "cached final response");
        Ok(())
    }

    pub fn contains(&self, key: &UnitKey) -> bool {
        self.entry_path(key).exists()
    }

    /// Number of cached documents across all kinds
    pub fn entry_count(&self) -> usize {
        let mut count = 0;
        let Ok(kinds) = fs::read_dir(&self.root) else {
            return 0;
        };
        for kind_dir in kinds.filter_map(|e| e.ok()) {
            let Ok(entries) = fs::read_dir(kind_dir.path()) else {
                continue;
            };
            count += entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                .count();
        }
        count
    }

    /// Drop every cached document. The next run refetches from scratch.
    pub fn clear(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}
