//! JSON-file backed profile store.

use super::{MemoryStore, ProfileStore, StoreDocument};
use crate::error::StoreError;
use crate::models::{Account, Snapshot};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Profile store persisted as a single JSON document.
///
/// The whole document is loaded on open and rewritten after every mutation.
pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let inner = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let document: StoreDocument = serde_json::from_str(&content)?;
            info!(
                "Loaded {} accounts and {} snapshots from {}",
                document.accounts.len(),
                document.snapshots.len(),
                path.display()
            );
            MemoryStore::from_document(document)
        } else {
            debug!("No store at {}, starting empty", path.display());
            MemoryStore::new()
        };

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.inner.to_document())?;
        write_atomic(&self.path, content.as_bytes())?;

        debug!("Saved store to {}", self.path.display());
        Ok(())
    }
}

/// Replaces `path` with `content` through a uniquely named temp file in the
/// same directory, so readers never see a partial document.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl ProfileStore for JsonStore {
    fn accounts(&self, skip: usize, limit: usize) -> Result<Vec<Account>, StoreError> {
        self.inner.accounts(skip, limit)
    }

    fn add_account(&mut self, username: &str) -> Result<Account, StoreError> {
        let account = self.inner.add_account(username)?;
        self.save()?;
        Ok(account)
    }

    fn remove_account(&mut self, username: &str) -> Result<(), StoreError> {
        self.inner.remove_account(username)?;
        self.save()
    }

    fn record_snapshot(&mut self, snapshot: Snapshot) -> Result<(), StoreError> {
        self.inner.record_snapshot(snapshot)?;
        self.save()
    }

    fn record_snapshots(&mut self, snapshots: Vec<Snapshot>) -> Result<(), StoreError> {
        self.inner.record_snapshots(snapshots)?;
        self.save()
    }

    fn fetch_snapshots(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.inner.fetch_snapshots(username, since)
    }

    fn latest_snapshot(&self, username: &str) -> Result<Option<Snapshot>, StoreError> {
        self.inner.latest_snapshot(username)
    }

    fn latest_snapshots(&self) -> Result<Vec<Snapshot>, StoreError> {
        self.inner.latest_snapshots()
    }

    fn snapshot_at(
        &self,
        username: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, StoreError> {
        self.inner.snapshot_at(username, target)
    }
}
