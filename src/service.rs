//! Analytics service.
//!
//! Glues a [`ProfileStore`] to the analytics engine: fetches the history
//! window for a request, runs the computation, and keeps recent results in a
//! [`MetricsCache`] until they expire or new snapshots arrive.

use crate::analysis::window::{check_window, window_start};
use crate::analysis::{compute_comparison, compute_growth_metrics, ROLLING_WINDOW_DAYS};
use crate::cache::{CacheKey, CacheKind, MetricsCache};
use crate::error::{AnalysisError, ServiceError};
use crate::models::{
    Account, Comparison, FollowerChanges, GrowthMetrics, RollingAverageView, Snapshot,
};
use crate::store::ProfileStore;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

/// Cache lifetimes per computation.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    /// Growth metrics.
    pub growth: StdDuration,
    /// Change and rolling-average views.
    pub default: StdDuration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            growth: StdDuration::from_secs(900),
            default: StdDuration::from_secs(3600),
        }
    }
}

/// Analytics over a profile store.
pub struct AnalyticsService<S: ProfileStore> {
    store: S,
    cache: MetricsCache,
    ttl: CacheTtl,
    clock: fn() -> DateTime<Utc>,
}

impl<S: ProfileStore> AnalyticsService<S> {
    pub fn new(store: S, ttl: CacheTtl) -> Self {
        Self {
            store,
            cache: MetricsCache::new(),
            ttl,
            clock: Utc::now,
        }
    }

    /// Replaces the wall clock used to place history windows and expire
    /// cache entries.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the in-memory cache, typically with one opened from disk.
    pub fn with_cache(mut self, cache: MetricsCache) -> Self {
        self.cache = cache;
        self
    }

    fn history_since(&self, username: &str, days: i64) -> Result<Vec<Snapshot>, ServiceError> {
        let since = window_start((self.clock)(), Duration::try_days(days), "lookback", days)?;
        let snapshots = self.store.fetch_snapshots(username, since)?;
        debug!(
            "Fetched {} snapshots for {} since {}",
            snapshots.len(),
            username,
            since
        );
        Ok(snapshots)
    }

    fn metrics_for(
        &self,
        username: &str,
        fetch_days: i64,
        lookback_days: i64,
        what: &'static str,
    ) -> Result<GrowthMetrics, ServiceError> {
        let snapshots = self.history_since(username, fetch_days)?;
        compute_growth_metrics(username, &snapshots, lookback_days)?
            .ok_or_else(|| ServiceError::not_found(what, username))
    }

    /// Returns the cached value for `key`, or computes and caches it.
    fn cached<T, F>(
        &mut self,
        key: CacheKey,
        ttl: StdDuration,
        refresh: bool,
        compute: F,
    ) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&Self) -> Result<T, ServiceError>,
    {
        let now = (self.clock)();
        if refresh {
            self.cache.delete(&key);
        } else if let Some(value) = self.cache.get(&key, now) {
            match serde_json::from_value(value) {
                Ok(hit) => return Ok(hit),
                Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let fresh = compute(self)?;
        self.cache.set(key, serde_json::to_value(&fresh)?, ttl, now);
        Ok(fresh)
    }

    /// Growth metrics over the last `days` days.
    pub fn growth(
        &mut self,
        username: &str,
        days: i64,
        refresh: bool,
    ) -> Result<GrowthMetrics, ServiceError> {
        check_window("lookback", days)?;
        let key = CacheKey::new(CacheKind::Growth, username, days);
        let ttl = self.ttl.growth;
        self.cached(key, ttl, refresh, |svc| {
            svc.metrics_for(username, days, days, "Growth metrics")
        })
    }

    /// Scrape-by-scrape changes over the last `days` days.
    pub fn changes(&mut self, username: &str, days: i64) -> Result<FollowerChanges, ServiceError> {
        check_window("lookback", days)?;
        let key = CacheKey::new(CacheKind::Changes, username, days);
        let ttl = self.ttl.default;
        self.cached(key, ttl, false, |svc| {
            svc.metrics_for(username, days, days, "Follower changes")
                .map(FollowerChanges::from)
        })
    }

    /// Rolling average, computed over `days` plus one extra rolling window
    /// of history so the window is filled.
    pub fn rolling_average(
        &mut self,
        username: &str,
        days: i64,
    ) -> Result<RollingAverageView, ServiceError> {
        check_window("lookback", days)?;
        let key = CacheKey::new(CacheKind::Rolling, username, days);
        let ttl = self.ttl.default;
        let span = days
            .checked_add(ROLLING_WINDOW_DAYS)
            .ok_or(AnalysisError::WindowTooLarge {
                name: "lookback",
                value: days,
            })?;
        self.cached(key, ttl, false, |svc| {
            svc.metrics_for(username, span, span, "Rolling average")
                .map(RollingAverageView::from)
        })
    }

    /// Compares growth of several accounts over the same window.
    pub fn compare(&self, usernames: &[String], days: i64) -> Result<Comparison, ServiceError> {
        check_window("lookback", days)?;

        let mut snapshots_by_entity = HashMap::new();
        for username in usernames {
            if !snapshots_by_entity.contains_key(username) {
                snapshots_by_entity.insert(username.clone(), self.history_since(username, days)?);
            }
        }

        let comparison = compute_comparison(usernames, &snapshots_by_entity, days)?;
        info!(
            "Compared {} of {} requested accounts",
            comparison.accounts.len(),
            usernames.len()
        );
        Ok(comparison)
    }

    /// Latest snapshot of every tracked account.
    pub fn latest_profiles(&self) -> Result<Vec<Snapshot>, ServiceError> {
        Ok(self.store.latest_snapshots()?)
    }

    /// Latest snapshot of one account.
    pub fn current_profile(&self, username: &str) -> Result<Snapshot, ServiceError> {
        self.store
            .latest_snapshot(username)?
            .ok_or_else(|| ServiceError::not_found("Profile", username))
    }

    /// Snapshots from the last `days` days.
    pub fn history(&self, username: &str, days: i64) -> Result<Vec<Snapshot>, ServiceError> {
        check_window("lookback", days)?;
        let snapshots = self.history_since(username, days)?;
        if snapshots.is_empty() {
            return Err(ServiceError::not_found("Profile history", username));
        }
        Ok(snapshots)
    }

    /// Follower count at or before `target`.
    pub fn followers_at(
        &self,
        username: &str,
        target: DateTime<Utc>,
    ) -> Result<Snapshot, ServiceError> {
        self.store
            .snapshot_at(username, target)?
            .ok_or_else(|| ServiceError::not_found("Follower count", username))
    }

    pub fn accounts(&self, skip: usize, limit: usize) -> Result<Vec<Account>, ServiceError> {
        Ok(self.store.accounts(skip, limit)?)
    }

    pub fn add_account(&mut self, username: &str) -> Result<Account, ServiceError> {
        let account = self.store.add_account(username)?;
        info!("Now tracking {}", username);
        Ok(account)
    }

    pub fn remove_account(&mut self, username: &str) -> Result<(), ServiceError> {
        self.store.remove_account(username)?;
        self.cache.invalidate_entity(username);
        info!("Stopped tracking {}", username);
        Ok(())
    }

    /// Records new snapshots and drops cached results for their accounts.
    pub fn ingest(&mut self, snapshots: Vec<Snapshot>) -> Result<usize, ServiceError> {
        let count = snapshots.len();
        let touched: BTreeSet<String> = snapshots.iter().map(|s| s.username.clone()).collect();

        self.store.record_snapshots(snapshots)?;
        for username in &touched {
            self.cache.invalidate_entity(username);
        }

        info!(
            "Ingested {} snapshots for {} accounts ({} cache entries left)",
            count,
            touched.len(),
            self.cache.len()
        );
        Ok(count)
    }
}
