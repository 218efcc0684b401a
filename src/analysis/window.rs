//! Time-window lookups over a sorted snapshot sequence.
//!
//! Both computations here assume the caller has checked ascending order;
//! [`crate::analysis::compute_growth_metrics`] does that before calling in.

use crate::error::AnalysisError;
use crate::models::{round_to, PeriodChange, RollingAverage, Snapshot};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Hours in one normalized day.
const HOURS_PER_DAY: f64 = 24.0;

/// Returns the most recent snapshot at or before `target`.
///
/// Binary search over a slice sorted by `checked_at`. With duplicate
/// timestamps the last one wins, which matches a reverse linear scan.
pub fn nearest_at_or_before(snapshots: &[Snapshot], target: DateTime<Utc>) -> Option<&Snapshot> {
    let idx = snapshots.partition_point(|s| s.checked_at <= target);
    idx.checked_sub(1).map(|i| &snapshots[i])
}

/// Elapsed hours from `from` to `to`, at microsecond precision.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let elapsed = to - from;
    match elapsed.num_microseconds() {
        Some(us) => us as f64 / 3_600_000_000.0,
        None => elapsed.num_seconds() as f64 / 3600.0,
    }
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64 * 100.0
    } else {
        0.0
    }
}

pub(crate) fn check_window(name: &'static str, value: i64) -> Result<(), AnalysisError> {
    if value < 0 {
        return Err(AnalysisError::NegativeWindow { name, value });
    }
    Ok(())
}

/// `end` moved back by `span`, where `span` was built from the window `value`.
///
/// Fails when the span itself could not be built or the result falls
/// outside the representable time range.
pub(crate) fn window_start(
    end: DateTime<Utc>,
    span: Option<Duration>,
    name: &'static str,
    value: i64,
) -> Result<DateTime<Utc>, AnalysisError> {
    span.and_then(|span| end.checked_sub_signed(span))
        .ok_or(AnalysisError::WindowTooLarge { name, value })
}

/// Change over the last `hours` hours.
///
/// The reference point is the latest snapshot, other than the most recent
/// one, taken at or before `now - hours`. When every earlier snapshot is
/// newer than that, the oldest snapshot is used and `hours_actual` reports
/// the shorter span.
pub fn period_change(snapshots: &[Snapshot], hours: i64) -> Result<PeriodChange, AnalysisError> {
    check_window("period", hours)?;

    let Some((latest, earlier)) = snapshots.split_last() else {
        return Ok(PeriodChange::default());
    };
    let Some(oldest) = earlier.first() else {
        return Ok(PeriodChange::default());
    };

    let target = window_start(latest.checked_at, Duration::try_hours(hours), "period", hours)?;
    let reference = nearest_at_or_before(earlier, target).unwrap_or(oldest);

    let change = latest.follower_count - reference.follower_count;

    Ok(PeriodChange {
        change,
        percentage: round_to(percentage(change, reference.follower_count), 2),
        previous_count: Some(reference.follower_count),
        current_count: Some(latest.follower_count),
        hours_actual: Some(round_to(
            hours_between(reference.checked_at, latest.checked_at),
            1,
        )),
        from_timestamp: Some(reference.checked_at),
        to_timestamp: Some(latest.checked_at),
    })
}

/// Average day-over-day change across the trailing `days` days.
///
/// Each calendar day (UTC) is represented by its latest snapshot. Gaps
/// between representatives that are not exactly 24 hours are scaled to a
/// 24-hour rate before averaging.
pub fn rolling_average(snapshots: &[Snapshot], days: i64) -> Result<RollingAverage, AnalysisError> {
    check_window("rolling", days)?;

    let Some(latest) = snapshots.last() else {
        return Ok(RollingAverage::default());
    };
    if snapshots.len() < 2 {
        return Ok(RollingAverage::default());
    }

    let start = window_start(latest.checked_at, Duration::try_days(days), "rolling", days)?;
    let window = &snapshots[snapshots.partition_point(|s| s.checked_at < start)..];

    if window.len() < 2 {
        return Ok(RollingAverage {
            data_points: window.len(),
            ..RollingAverage::default()
        });
    }

    let mut daily: BTreeMap<NaiveDate, &Snapshot> = BTreeMap::new();
    for snapshot in window {
        daily.insert(snapshot.checked_at.date_naive(), snapshot);
    }

    let representatives: Vec<&Snapshot> = daily.values().copied().collect();
    let day_changes: Vec<f64> = representatives
        .windows(2)
        .map(|pair| {
            let change = (pair[1].follower_count - pair[0].follower_count) as f64;
            let hours = hours_between(pair[0].checked_at, pair[1].checked_at);
            if hours > 0.0 && hours != HOURS_PER_DAY {
                change / hours * HOURS_PER_DAY
            } else {
                change
            }
        })
        .collect();

    let total: f64 = day_changes.iter().sum();
    let average = if day_changes.is_empty() {
        0.0
    } else {
        total / day_changes.len() as f64
    };

    Ok(RollingAverage {
        average_change: round_to(average, 2),
        data_points: window.len(),
        total_change: Some(total),
        days_covered: Some(daily.len()),
        from_date: window.first().map(|s| s.checked_at.date_naive()),
        to_date: window.last().map(|s| s.checked_at.date_naive()),
    })
}
