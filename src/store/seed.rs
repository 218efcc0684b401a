//! Deterministic sample history for demos and local development.

use crate::models::Snapshot;
use chrono::{DateTime, Duration, Utc};

/// Growth pattern of a seeded account.
#[derive(Debug, Clone, Copy)]
struct SeedPattern {
    start: i64,
    daily_base: i64,
    daily_slope: i64,
}

fn pattern_for(index: usize) -> SeedPattern {
    match index {
        0 => SeedPattern {
            start: 500_000_000,
            daily_base: 50_000,
            daily_slope: 1_000,
        },
        1 => SeedPattern {
            start: 30_000_000,
            daily_base: 20_000,
            daily_slope: 500,
        },
        n => SeedPattern {
            start: 1_000_000 * (n as i64 + 1),
            daily_base: 1_000,
            daily_slope: 10,
        },
    }
}

fn display_name(username: &str) -> String {
    let mut chars = username.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One snapshot per day from `days` days ago up to `now`, oldest first.
///
/// Growth slows towards `now`: each day adds `base + days_ago * slope`
/// followers, where the pattern depends on the account's position `index`.
pub fn sample_history(
    username: &str,
    index: usize,
    days: i64,
    now: DateTime<Utc>,
) -> Vec<Snapshot> {
    let pattern = pattern_for(index);
    let name = display_name(username);
    let mut follower_count = pattern.start;

    (0..=days.max(0))
        .rev()
        .map(|days_ago| {
            if days_ago > 0 {
                follower_count += pattern.daily_base + days_ago * pattern.daily_slope;
            }
            Snapshot {
                username: username.to_string(),
                follower_count,
                checked_at: now - Duration::days(days_ago),
                full_name: Some(name.clone()),
                profile_pic_url: Some(format!("https://example.com/{}.jpg", username)),
                biography: Some(format!("{} official account", name)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sample_history_shape() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let history = sample_history("instagram", 0, 30, now);

        assert_eq!(history.len(), 31);
        assert_eq!(history.last().unwrap().checked_at, now);
        assert_eq!(history[0].checked_at, now - Duration::days(30));
        assert_eq!(history[0].follower_count, 500_000_000 + 50_000 + 30_000);
        assert!(history
            .windows(2)
            .all(|w| w[1].follower_count >= w[0].follower_count));
        assert_eq!(history[0].full_name.as_deref(), Some("Instagram"));
    }

    #[test]
    fn test_last_day_adds_nothing() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let history = sample_history("google", 1, 2, now);

        let counts: Vec<i64> = history.iter().map(|s| s.follower_count).collect();
        assert_eq!(counts, vec![30_021_000, 30_041_500, 30_041_500]);
    }
}
