//! Scraper service integration.
//!
//! The scraper owns data collection; this module proxies its REST API and
//! copies its latest observations into the local store.

pub mod client;

pub use client::{ScrapedAccount, ScrapedProfile, ScraperClient, ScraperConfig, ScraperStatus};

use crate::service::AnalyticsService;
use crate::store::ProfileStore;
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

/// Pulls the scraper's latest profiles into the service's store.
///
/// Returns the number of snapshots recorded.
pub async fn sync_latest<S: ProfileStore>(
    client: &ScraperClient,
    service: &mut AnalyticsService<S>,
) -> Result<usize> {
    let profiles = client
        .fetch_latest_profiles()
        .await
        .context("Failed to fetch latest profiles from scraper")?;

    let now = Utc::now();
    let snapshots = profiles
        .into_iter()
        .map(|profile| profile.into_snapshot(now))
        .collect();

    let recorded = service
        .ingest(snapshots)
        .context("Failed to record scraped profiles")?;
    info!("Synced {} profiles from scraper", recorded);
    Ok(recorded)
}
