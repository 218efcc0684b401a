//! Account and snapshot persistence.
//!
//! The analytics service only talks to [`ProfileStore`]. [`MemoryStore`]
//! keeps everything in memory and doubles as the test fake; [`JsonStore`]
//! persists the same data to a JSON document on disk.

pub mod json;
pub mod seed;

pub use json::JsonStore;
pub use seed::sample_history;

use crate::analysis::nearest_at_or_before;
use crate::error::StoreError;
use crate::models::{Account, AccountStatus, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Source and sink of account snapshots.
pub trait ProfileStore {
    /// Tracked accounts ordered by id.
    fn accounts(&self, skip: usize, limit: usize) -> Result<Vec<Account>, StoreError>;

    /// Starts tracking an account.
    fn add_account(&mut self, username: &str) -> Result<Account, StoreError>;

    /// Stops tracking an account and drops its history.
    fn remove_account(&mut self, username: &str) -> Result<(), StoreError>;

    /// Records one observation, tracking the account if it is new.
    fn record_snapshot(&mut self, snapshot: Snapshot) -> Result<(), StoreError>;

    /// Records a batch of observations.
    fn record_snapshots(&mut self, snapshots: Vec<Snapshot>) -> Result<(), StoreError> {
        for snapshot in snapshots {
            self.record_snapshot(snapshot)?;
        }
        Ok(())
    }

    /// Snapshots taken at or after `since`, ascending by time.
    fn fetch_snapshots(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError>;

    /// Most recent snapshot of one account.
    fn latest_snapshot(&self, username: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Most recent snapshot of every account, ordered by username.
    fn latest_snapshots(&self) -> Result<Vec<Snapshot>, StoreError>;

    /// Most recent snapshot taken at or before `target`.
    fn snapshot_at(
        &self,
        username: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, StoreError>;
}

/// Serialized form of a store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Vec<Account>,
    next_id: u64,
    // Each history is kept sorted by `checked_at`.
    history: BTreeMap<String, Vec<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from its serialized form.
    pub fn from_document(document: StoreDocument) -> Self {
        let mut store = Self {
            next_id: document.accounts.iter().map(|a| a.id).max().unwrap_or(0),
            accounts: document.accounts,
            history: BTreeMap::new(),
        };
        store.accounts.sort_by_key(|a| a.id);
        for snapshot in document.snapshots {
            store.insert_sorted(snapshot);
        }
        store
    }

    /// Serialized form of this store.
    pub fn to_document(&self) -> StoreDocument {
        StoreDocument {
            accounts: self.accounts.clone(),
            snapshots: self.history.values().flatten().cloned().collect(),
        }
    }

    fn find(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }

    fn track(&mut self, username: &str) -> Account {
        self.next_id += 1;
        let account = Account {
            id: self.next_id,
            username: username.to_string(),
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        self.accounts.push(account.clone());
        account
    }

    fn insert_sorted(&mut self, snapshot: Snapshot) {
        let history = self.history.entry(snapshot.username.clone()).or_default();
        // Equal timestamps keep arrival order.
        let idx = history.partition_point(|s| s.checked_at <= snapshot.checked_at);
        history.insert(idx, snapshot);
    }

    fn history(&self, username: &str) -> &[Snapshot] {
        self.history.get(username).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl ProfileStore for MemoryStore {
    fn accounts(&self, skip: usize, limit: usize) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.iter().skip(skip).take(limit).cloned().collect())
    }

    fn add_account(&mut self, username: &str) -> Result<Account, StoreError> {
        if self.find(username).is_some() {
            return Err(StoreError::DuplicateAccount(username.to_string()));
        }
        Ok(self.track(username))
    }

    fn remove_account(&mut self, username: &str) -> Result<(), StoreError> {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.username != username);
        if self.accounts.len() == before {
            return Err(StoreError::UnknownAccount(username.to_string()));
        }
        self.history.remove(username);
        Ok(())
    }

    fn record_snapshot(&mut self, snapshot: Snapshot) -> Result<(), StoreError> {
        if self.find(&snapshot.username).is_none() {
            debug!("Tracking new account {}", snapshot.username);
            self.track(&snapshot.username);
        }
        self.insert_sorted(snapshot);
        Ok(())
    }

    fn fetch_snapshots(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let history = self.history(username);
        let start = history.partition_point(|s| s.checked_at < since);
        Ok(history[start..].to_vec())
    }

    fn latest_snapshot(&self, username: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.history(username).last().cloned())
    }

    fn latest_snapshots(&self) -> Result<Vec<Snapshot>, StoreError> {
        Ok(self
            .history
            .values()
            .filter_map(|history| history.last().cloned())
            .collect())
    }

    fn snapshot_at(
        &self,
        username: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, StoreError> {
        Ok(nearest_at_or_before(self.history(username), target).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .record_snapshots(vec![
                Snapshot::new("bob", 50, t(5)),
                Snapshot::new("alice", 10, t(0)),
                Snapshot::new("alice", 30, t(24)),
                Snapshot::new("alice", 20, t(12)),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_record_keeps_history_sorted() {
        let store = seeded();
        let history = store.fetch_snapshots("alice", t(-100)).unwrap();
        let counts: Vec<i64> = history.iter().map(|s| s.follower_count).collect();
        assert_eq!(counts, vec![10, 20, 30]);
    }

    #[test]
    fn test_record_tracks_new_accounts() {
        let store = seeded();
        let accounts = store.accounts(0, 100).unwrap();
        let names: Vec<&str> = accounts.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice"]);
        assert_eq!(accounts[0].id, 1);
        assert_eq!(accounts[1].id, 2);
    }

    #[test]
    fn test_accounts_pagination() {
        let mut store = MemoryStore::new();
        for name in ["a", "b", "c", "d"] {
            store.add_account(name).unwrap();
        }
        let page = store.accounts(1, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].username, "b");
        assert_eq!(page[1].username, "c");
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let mut store = MemoryStore::new();
        store.add_account("carol").unwrap();
        assert!(matches!(
            store.add_account("carol"),
            Err(StoreError::DuplicateAccount(_))
        ));
    }

    #[test]
    fn test_remove_account_drops_history() {
        let mut store = seeded();
        store.remove_account("alice").unwrap();
        assert!(store.latest_snapshot("alice").unwrap().is_none());
        assert!(matches!(
            store.remove_account("alice"),
            Err(StoreError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_fetch_since_is_inclusive() {
        let store = seeded();
        let history = store.fetch_snapshots("alice", t(12)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].follower_count, 20);
        assert!(store.fetch_snapshots("nobody", t(0)).unwrap().is_empty());
    }

    #[test]
    fn test_latest_snapshots_one_per_account() {
        let store = seeded();
        let latest = store.latest_snapshots().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].username, "alice");
        assert_eq!(latest[0].follower_count, 30);
        assert_eq!(latest[1].follower_count, 50);
    }

    #[test]
    fn test_snapshot_at_picks_nearest_before() {
        let store = seeded();
        let found = store.snapshot_at("alice", t(18)).unwrap().unwrap();
        assert_eq!(found.follower_count, 20);
        assert!(store.snapshot_at("alice", t(-1)).unwrap().is_none());
    }

    #[test]
    fn test_document_round_trip_preserves_ids() {
        let store = seeded();
        let restored = MemoryStore::from_document(store.to_document());
        assert_eq!(
            restored.accounts(0, 10).unwrap(),
            store.accounts(0, 10).unwrap()
        );

        let mut restored = restored;
        let account = restored.add_account("dave").unwrap();
        assert_eq!(account.id, 3);
    }
}
