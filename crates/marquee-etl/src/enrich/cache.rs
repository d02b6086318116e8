//! Persistent cache of OMDb responses.
//!
//! The cache is a single JSON object mapping `"<title>|<year>"` to the raw
//! OMDb response. A `null` value records a lookup that produced nothing, so
//! it is not retried on the next run. The same file feeds mock mode.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::EtlResult;

/// Build the cache key for a movie. Missing parts render as `None`.
pub fn cache_key(title: Option<&str>, year: Option<i64>) -> String {
    format!("{}|{}", or_none(title), or_none(year))
}

fn or_none<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

/// Responses keyed by [`cache_key`], kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct OmdbCache {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl OmdbCache {
    /// Load the cache at `path`.
    ///
    /// A missing or unreadable file yields an empty cache bound to `path`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: Map<String, Value> = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable cache {}: {}", path.display(), e);
                Map::new()
            }),
            Err(_) => Map::new(),
        };
        log::debug!("Loaded {} cached responses from {}", entries.len(), path.display());
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, response: Value) {
        self.entries.insert(key, response);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy of every cached response, for serving lookups offline.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Write the cache back to its file as indented JSON.
    pub fn save(&self) -> EtlResult<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
