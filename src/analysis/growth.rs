//! Growth metrics for a single account.

use crate::analysis::window::{
    check_window, hours_between, percentage, period_change, rolling_average,
};
use crate::error::AnalysisError;
use crate::models::{round_to, GrowthMetrics, ScrapeChange, Snapshot};

/// Look-back of the short period change.
pub const SHORT_PERIOD_HOURS: i64 = 12;
/// Look-back of the daily period change.
pub const DAILY_PERIOD_HOURS: i64 = 24;
/// Trailing window of the rolling average.
pub const ROLLING_WINDOW_DAYS: i64 = 7;

/// Checks that timestamps never decrease.
pub fn ensure_sorted(snapshots: &[Snapshot]) -> Result<(), AnalysisError> {
    match snapshots
        .windows(2)
        .position(|pair| pair[1].checked_at < pair[0].checked_at)
    {
        Some(i) => Err(AnalysisError::UnsortedSnapshots { index: i + 1 }),
        None => Ok(()),
    }
}

/// Deltas between every pair of consecutive snapshots, in input order.
pub fn changes_between_scrapes(snapshots: &[Snapshot]) -> Vec<ScrapeChange> {
    snapshots
        .windows(2)
        .map(|pair| ScrapeChange {
            previous_count: pair[0].follower_count,
            current_count: pair[1].follower_count,
            change: pair[1].follower_count - pair[0].follower_count,
            previous_timestamp: pair[0].checked_at,
            current_timestamp: pair[1].checked_at,
            hours_between: hours_between(pair[0].checked_at, pair[1].checked_at),
        })
        .collect()
}

/// Computes growth metrics for `username` from its snapshot history.
///
/// `snapshots` must be sorted ascending by `checked_at`; out-of-order input
/// is rejected rather than re-sorted. Returns `Ok(None)` when fewer than two
/// snapshots are available. A `lookback_days` of zero is accepted and yields
/// an average daily growth of zero.
pub fn compute_growth_metrics(
    username: &str,
    snapshots: &[Snapshot],
    lookback_days: i64,
) -> Result<Option<GrowthMetrics>, AnalysisError> {
    check_window("lookback", lookback_days)?;
    ensure_sorted(snapshots)?;

    let (first, last) = match snapshots {
        [first, .., last] => (first, last),
        _ => return Ok(None),
    };

    let net_growth = last.follower_count - first.follower_count;
    let average_daily_growth = if lookback_days > 0 {
        net_growth as f64 / lookback_days as f64
    } else {
        0.0
    };

    Ok(Some(GrowthMetrics {
        username: username.to_string(),
        start_date: first.checked_at,
        end_date: last.checked_at,
        start_followers: first.follower_count,
        end_followers: last.follower_count,
        net_growth,
        percentage_growth: round_to(percentage(net_growth, first.follower_count), 2),
        average_daily_growth: round_to(average_daily_growth, 2),
        change_12h: period_change(snapshots, SHORT_PERIOD_HOURS)?,
        change_24h: period_change(snapshots, DAILY_PERIOD_HOURS)?,
        rolling_avg_7day: rolling_average(snapshots, ROLLING_WINDOW_DAYS)?,
        changes_between_scrapes: changes_between_scrapes(snapshots),
        data_points: snapshots.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()
    }

    fn series(points: &[(i64, i64)]) -> Vec<Snapshot> {
        points
            .iter()
            .map(|&(h, v)| Snapshot::new("acct", v, base() + Duration::hours(h)))
            .collect()
    }

    #[test]
    fn test_two_point_scenario() {
        let snapshots = series(&[(0, 1000), (24, 1050)]);
        let metrics = compute_growth_metrics("acct", &snapshots, 1)
            .unwrap()
            .unwrap();

        assert_eq!(metrics.net_growth, 50);
        assert_eq!(metrics.percentage_growth, 5.0);
        assert_eq!(metrics.average_daily_growth, 50.0);
        assert_eq!(metrics.changes_between_scrapes.len(), 1);
        assert_eq!(metrics.changes_between_scrapes[0].change, 50);
        assert_eq!(metrics.changes_between_scrapes[0].hours_between, 24.0);
        assert_eq!(metrics.start_followers, 1000);
        assert_eq!(metrics.end_followers, 1050);
        assert_eq!(metrics.data_points, 2);
    }

    #[test]
    fn test_insufficient_data_is_none() {
        assert_eq!(compute_growth_metrics("acct", &[], 30), Ok(None));
        let one = series(&[(0, 10)]);
        assert_eq!(compute_growth_metrics("acct", &one, 30), Ok(None));
    }

    #[test]
    fn test_deltas_sum_to_net_growth() {
        let snapshots = series(&[(0, 500), (5, 480), (11, 530), (30, 529), (50, 700)]);
        let metrics = compute_growth_metrics("acct", &snapshots, 3)
            .unwrap()
            .unwrap();

        assert_eq!(metrics.net_growth, 200);
        assert_eq!(metrics.changes_between_scrapes.len(), snapshots.len() - 1);
        let sum: i64 = metrics.changes_between_scrapes.iter().map(|c| c.change).sum();
        assert_eq!(sum, metrics.net_growth);
        assert_eq!(metrics.changes_between_scrapes[1].previous_count, 480);
        assert_eq!(metrics.changes_between_scrapes[3].hours_between, 20.0);
    }

    #[test]
    fn test_zero_start_never_divides() {
        let snapshots = series(&[(0, 0), (24, 75)]);
        let metrics = compute_growth_metrics("acct", &snapshots, 0)
            .unwrap()
            .unwrap();

        assert_eq!(metrics.percentage_growth, 0.0);
        assert_eq!(metrics.average_daily_growth, 0.0);
        assert_eq!(metrics.change_24h.percentage, 0.0);
    }

    #[test]
    fn test_negative_growth_is_legal() {
        let snapshots = series(&[(0, 2000), (24, 1900)]);
        let metrics = compute_growth_metrics("acct", &snapshots, 2)
            .unwrap()
            .unwrap();

        assert_eq!(metrics.net_growth, -100);
        assert_eq!(metrics.percentage_growth, -5.0);
        assert_eq!(metrics.average_daily_growth, -50.0);
    }

    #[test]
    fn test_percentage_is_rounded() {
        let snapshots = series(&[(0, 3), (24, 4)]);
        let metrics = compute_growth_metrics("acct", &snapshots, 3)
            .unwrap()
            .unwrap();

        assert_eq!(metrics.percentage_growth, 33.33);
        assert_eq!(metrics.average_daily_growth, 0.33);
    }

    #[test]
    fn test_period_changes_are_wired() {
        let snapshots = series(&[(0, 100), (6, 110), (13, 120), (24, 150)]);
        let metrics = compute_growth_metrics("acct", &snapshots, 1)
            .unwrap()
            .unwrap();

        assert_eq!(metrics.change_12h.previous_count, Some(110));
        assert_eq!(metrics.change_24h.previous_count, Some(100));
        assert_eq!(metrics.change_24h.change, 50);
        assert_eq!(metrics.change_24h.percentage, 50.0);
    }

    #[test]
    fn test_unsorted_input_is_rejected() {
        let snapshots = series(&[(0, 100), (24, 110), (12, 120)]);
        assert_eq!(
            compute_growth_metrics("acct", &snapshots, 1),
            Err(AnalysisError::UnsortedSnapshots { index: 2 })
        );
    }

    #[test]
    fn test_equal_timestamps_are_allowed() {
        let snapshots = series(&[(0, 100), (0, 105), (24, 110)]);
        let metrics = compute_growth_metrics("acct", &snapshots, 1)
            .unwrap()
            .unwrap();
        assert_eq!(metrics.changes_between_scrapes[0].hours_between, 0.0);
    }

    #[test]
    fn test_negative_lookback_is_rejected() {
        let snapshots = series(&[(0, 100), (24, 110)]);
        assert!(matches!(
            compute_growth_metrics("acct", &snapshots, -3),
            Err(AnalysisError::NegativeWindow { name: "lookback", .. })
        ));
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let snapshots = series(&[(0, 100), (7, 130), (19, 90), (31, 400), (55, 401)]);
        let first = compute_growth_metrics("acct", &snapshots, 3).unwrap();
        let second = compute_growth_metrics("acct", &snapshots, 3).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
