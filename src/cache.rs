//! Cache for computed analytics, kept between runs.
//!
//! Entries are stored as JSON values keyed by account, window and kind,
//! and expire at a wall-clock deadline. A cache opened with a path is
//! written back to that JSON document after every change, so results
//! survive from one invocation to the next. Recording new snapshots for an
//! account should be followed by [`MetricsCache::invalidate_entity`].

use crate::store::json::write_atomic;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

/// Which computation a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Growth,
    Changes,
    Rolling,
}

impl CacheKind {
    fn prefix(&self) -> &'static str {
        match self {
            CacheKind::Growth => "growth_metrics",
            CacheKind::Changes => "follower_changes",
            CacheKind::Rolling => "rolling_average",
        }
    }
}

/// Cache key for one (account, window, computation) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub username: String,
    pub days: i64,
}

impl CacheKey {
    pub fn new(kind: CacheKind, username: &str, days: i64) -> Self {
        Self {
            kind,
            username: username.to_string(),
            days,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind.prefix(), self.username, self.days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    key: CacheKey,
    value: Value,
    expires_at: DateTime<Utc>,
}

/// Serialized form of a cache.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    entries: Vec<Entry>,
}

/// TTL cache, optionally backed by a JSON document.
#[derive(Debug, Default)]
pub struct MetricsCache {
    entries: HashMap<CacheKey, Entry>,
    path: Option<PathBuf>,
}

impl MetricsCache {
    /// A cache that lives only as long as this value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the cache document at `path`.
    ///
    /// A missing or unreadable document starts an empty cache; entries
    /// already expired at `now` are dropped.
    pub fn open(path: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        let path = path.into();
        let document = match Self::read_document(&path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Ignoring cache at {}: {}", path.display(), e);
                CacheDocument::default()
            }
        };

        let entries: HashMap<CacheKey, Entry> = document
            .entries
            .into_iter()
            .filter(|entry| entry.expires_at > now)
            .map(|entry| (entry.key.clone(), entry))
            .collect();
        debug!("Loaded {} cache entries from {}", entries.len(), path.display());

        Self {
            entries,
            path: Some(path),
        }
    }

    fn read_document(path: &Path) -> anyhow::Result<CacheDocument> {
        if !path.exists() {
            return Ok(CacheDocument::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the entries back to the document, if there is one.
    ///
    /// The cache only saves work, so a failed write is logged, not raised.
    fn persist(&self) {
        let Some(ref path) = self.path else {
            return;
        };

        let document = CacheDocument {
            entries: self.entries.values().cloned().collect(),
        };
        let result = serde_json::to_vec_pretty(&document)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(write_atomic(path, &content)?));
        if let Err(e) = result {
            warn!("Failed to save cache to {}: {}", path.display(), e);
        }
    }

    pub fn get(&mut self, key: &CacheKey, now: DateTime<Utc>) -> Option<Value> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => entry.expires_at <= now,
        };

        if expired {
            debug!("Cache entry {} expired", key);
            self.entries.remove(key);
            self.persist();
            return None;
        }

        debug!("Cache hit: {}", key);
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn set(&mut self, key: CacheKey, value: Value, ttl: StdDuration, now: DateTime<Utc>) {
        let Some(expires_at) = Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
        else {
            warn!("Not caching {}: TTL of {}s is out of range", key, ttl.as_secs());
            return;
        };

        debug!("Caching {} for {}s", key, ttl.as_secs());
        self.entries.insert(
            key.clone(),
            Entry {
                key,
                value,
                expires_at,
            },
        );
        self.persist();
    }

    pub fn delete(&mut self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            self.persist();
        }
    }

    /// Drops every cached computation for `username`.
    pub fn invalidate_entity(&mut self, username: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.username != username);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Invalidated {} cache entries for {}", removed, username);
            self.persist();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
