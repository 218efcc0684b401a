//! Multi-account comparison and ranking.

use crate::analysis::growth::compute_growth_metrics;
use crate::error::AnalysisError;
use crate::models::{Comparison, GrowthMetrics, RankedGrowthMetrics, Rankings, Snapshot};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 1-based descending rank of each entry under `key`.
///
/// The sort is stable, so equal keys keep the order in which the entries
/// were given (first seen ranks higher).
fn rank_descending<F>(entries: &[GrowthMetrics], key: F) -> Vec<usize>
where
    F: Fn(&GrowthMetrics) -> f64,
{
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| key(&entries[b]).total_cmp(&key(&entries[a])));

    let mut ranks = vec![0; entries.len()];
    for (position, idx) in order.into_iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}

/// Compares growth across accounts over the same lookback window.
///
/// Accounts missing from `snapshots_by_entity` or with fewer than two
/// snapshots are left out of the result. Duplicate usernames count once,
/// at their first position, which also fixes their place under ties.
pub fn compute_comparison(
    usernames: &[String],
    snapshots_by_entity: &HashMap<String, Vec<Snapshot>>,
    lookback_days: i64,
) -> Result<Comparison, AnalysisError> {
    let mut seen = HashSet::new();
    let mut included = Vec::new();

    for username in usernames {
        if !seen.insert(username.as_str()) {
            continue;
        }
        let Some(snapshots) = snapshots_by_entity.get(username) else {
            debug!("No snapshots for {}, skipping", username);
            continue;
        };
        match compute_growth_metrics(username, snapshots, lookback_days)? {
            Some(metrics) => included.push(metrics),
            None => debug!("Insufficient data for {}, skipping", username),
        }
    }

    let net = rank_descending(&included, |m| m.net_growth as f64);
    let pct = rank_descending(&included, |m| m.percentage_growth);
    let daily = rank_descending(&included, |m| m.average_daily_growth);

    let accounts = included
        .into_iter()
        .enumerate()
        .map(|(i, metrics)| {
            let ranked = RankedGrowthMetrics {
                rankings: Rankings {
                    net_growth: net[i],
                    percentage_growth: pct[i],
                    daily_growth: daily[i],
                },
                metrics,
            };
            (ranked.metrics.username.clone(), ranked)
        })
        .collect();

    Ok(Comparison {
        accounts,
        comparison_period_days: lookback_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn history(username: &str, start: i64, end: i64) -> Vec<Snapshot> {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        vec![
            Snapshot::new(username, start, t0),
            Snapshot::new(username, end, t0 + Duration::days(10)),
        ]
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_net_growth_ranking() {
        let mut data = HashMap::new();
        data.insert("a".to_string(), history("a", 1000, 1100));
        data.insert("b".to_string(), history("b", 1000, 1050));
        data.insert("c".to_string(), history("c", 1000, 1200));

        let cmp = compute_comparison(&names(&["a", "b", "c"]), &data, 10).unwrap();

        assert_eq!(cmp.accounts["a"].rankings.net_growth, 2);
        assert_eq!(cmp.accounts["b"].rankings.net_growth, 3);
        assert_eq!(cmp.accounts["c"].rankings.net_growth, 1);
        assert_eq!(cmp.comparison_period_days, 10);
    }

    #[test]
    fn test_rankings_are_independent() {
        let mut data = HashMap::new();
        // Large absolute gain, small relative gain.
        data.insert("big".to_string(), history("big", 100_000, 101_000));
        // Small absolute gain, large relative gain.
        data.insert("small".to_string(), history("small", 100, 200));

        let cmp = compute_comparison(&names(&["big", "small"]), &data, 10).unwrap();

        assert_eq!(cmp.accounts["big"].rankings.net_growth, 1);
        assert_eq!(cmp.accounts["big"].rankings.percentage_growth, 2);
        assert_eq!(cmp.accounts["small"].rankings.net_growth, 2);
        assert_eq!(cmp.accounts["small"].rankings.percentage_growth, 1);
        assert_eq!(cmp.accounts["small"].rankings.daily_growth, 2);
    }

    #[test]
    fn test_insufficient_accounts_are_dropped() {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut data = HashMap::new();
        data.insert("full".to_string(), history("full", 10, 20));
        data.insert("single".to_string(), vec![Snapshot::new("single", 5, t0)]);

        let cmp = compute_comparison(&names(&["full", "single", "missing"]), &data, 30).unwrap();

        assert_eq!(cmp.accounts.len(), 1);
        assert_eq!(cmp.accounts["full"].rankings.net_growth, 1);
    }

    #[test]
    fn test_ties_rank_first_seen_first() {
        let mut data = HashMap::new();
        data.insert("x".to_string(), history("x", 100, 150));
        data.insert("y".to_string(), history("y", 100, 150));

        let cmp = compute_comparison(&names(&["y", "x", "y"]), &data, 10).unwrap();
        assert_eq!(cmp.accounts["y"].rankings.net_growth, 1);
        assert_eq!(cmp.accounts["x"].rankings.net_growth, 2);

        let cmp = compute_comparison(&names(&["x", "y"]), &data, 10).unwrap();
        assert_eq!(cmp.accounts["x"].rankings.net_growth, 1);
        assert_eq!(cmp.accounts["y"].rankings.net_growth, 2);
    }

    #[test]
    fn test_empty_comparison() {
        let cmp = compute_comparison(&[], &HashMap::new(), 30).unwrap();
        assert!(cmp.accounts.is_empty());
        assert_eq!(cmp.comparison_period_days, 30);
    }

    #[test]
    fn test_ranked_metrics_serialize_flat() {
        let mut data = HashMap::new();
        data.insert("a".to_string(), history("a", 10, 20));
        let cmp = compute_comparison(&names(&["a"]), &data, 10).unwrap();

        let json = serde_json::to_value(&cmp).unwrap();
        assert_eq!(json["accounts"]["a"]["net_growth"], 10);
        assert_eq!(json["accounts"]["a"]["rankings"]["daily_growth"], 1);
        assert_eq!(json["comparison_period_days"], 10);
    }
}
