//! Data models for follower tracking.
//!
//! This module contains the core data structures shared by the store,
//! the analytics engine, the cache and the report renderers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tracking status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Scraped on every run
    #[default]
    Active,
    /// Kept for history, no longer scraped
    Paused,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Paused => write!(f, "paused"),
        }
    }
}

/// A tracked account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned identifier.
    pub id: u64,
    /// Account handle, unique within the store.
    pub username: String,
    /// Tracking status.
    #[serde(default)]
    pub status: AccountStatus,
    /// When the account started being tracked.
    pub created_at: DateTime<Utc>,
}

/// One point-in-time observation of an account's follower count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Account handle this observation belongs to.
    pub username: String,
    /// Follower count. Counts can drop between observations.
    pub follower_count: i64,
    /// When the observation was made.
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
}

impl Snapshot {
    /// Creates a snapshot with no display fields.
    pub fn new(username: impl Into<String>, follower_count: i64, checked_at: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            follower_count,
            checked_at,
            full_name: None,
            profile_pic_url: None,
            biography: None,
        }
    }
}

/// Follower delta between two consecutive scrapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeChange {
    pub previous_count: i64,
    pub current_count: i64,
    pub change: i64,
    pub previous_timestamp: DateTime<Utc>,
    pub current_timestamp: DateTime<Utc>,
    /// Exact elapsed time in hours.
    pub hours_between: f64,
}

/// Change between the latest snapshot and the nearest one at least N hours older.
///
/// With fewer than two snapshots only `change` and `percentage` are present,
/// both zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodChange {
    pub change: i64,
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_count: Option<i64>,
    /// Hours actually covered, which can exceed the requested window on sparse data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_actual: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_timestamp: Option<DateTime<Utc>>,
}

/// Mean of day-over-day changes over a trailing window of calendar days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingAverage {
    pub average_change: f64,
    /// Raw snapshots inside the window.
    pub data_points: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_covered: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
}

/// Growth statistics for one account over a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub username: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub start_followers: i64,
    pub end_followers: i64,
    pub net_growth: i64,
    pub percentage_growth: f64,
    pub average_daily_growth: f64,
    pub change_12h: PeriodChange,
    pub change_24h: PeriodChange,
    pub rolling_avg_7day: RollingAverage,
    pub changes_between_scrapes: Vec<ScrapeChange>,
    pub data_points: usize,
}

/// 1-based positions of an account in each comparison ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rankings {
    pub net_growth: usize,
    pub percentage_growth: usize,
    pub daily_growth: usize,
}

/// Growth metrics annotated with comparison ranks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedGrowthMetrics {
    #[serde(flatten)]
    pub metrics: GrowthMetrics,
    pub rankings: Rankings,
}

/// Side-by-side growth of several accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub accounts: BTreeMap<String, RankedGrowthMetrics>,
    pub comparison_period_days: i64,
}

/// Scrape-level change view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerChanges {
    pub username: String,
    pub current_followers: i64,
    pub changes_between_scrapes: Vec<ScrapeChange>,
    pub change_12h: PeriodChange,
    pub change_24h: PeriodChange,
    pub data_points: usize,
}

impl From<GrowthMetrics> for FollowerChanges {
    fn from(metrics: GrowthMetrics) -> Self {
        Self {
            username: metrics.username,
            current_followers: metrics.end_followers,
            changes_between_scrapes: metrics.changes_between_scrapes,
            change_12h: metrics.change_12h,
            change_24h: metrics.change_24h,
            data_points: metrics.data_points,
        }
    }
}

/// Rolling-average view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingAverageView {
    pub username: String,
    pub current_followers: i64,
    pub rolling_avg_7day: RollingAverage,
}

impl From<GrowthMetrics> for RollingAverageView {
    fn from(metrics: GrowthMetrics) -> Self {
        Self {
            username: metrics.username,
            current_followers: metrics.end_followers,
            rolling_avg_7day: metrics.rolling_avg_7day,
        }
    }
}

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
