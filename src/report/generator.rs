//! Markdown and JSON report generation.
//!
//! Every result the CLI prints implements [`MarkdownReport`]; JSON output
//! is the serde representation of the same value.

use crate::models::{
    Account, Comparison, FollowerChanges, GrowthMetrics, PeriodChange, RankedGrowthMetrics,
    RollingAverage, RollingAverageView, ScrapeChange, Snapshot,
};
use crate::scraper::{ScrapedAccount, ScrapedProfile, ScraperStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// A value that renders as a titled Markdown document.
pub trait MarkdownReport {
    fn title(&self) -> String;
    fn body(&self) -> String;
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report<R: MarkdownReport + ?Sized>(report: &R) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.title()));
    output.push_str(&report.body());
    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize + ?Sized>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered output to a file, or stdout when no path is given.
pub fn write_report(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(content.as_bytes())?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                handle.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by followtrack v{} on {}*\n",
        env!("CARGO_PKG_VERSION"),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    footer
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

fn signed_f(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.2}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// One table row for a 12h/24h change.
fn period_row(label: &str, change: &PeriodChange) -> String {
    match (change.previous_count, change.current_count, change.hours_actual) {
        (Some(previous), Some(current), Some(hours)) => format!(
            "| {} | {} | {}% | {} → {} | {:.1}h |\n",
            label,
            signed(change.change),
            signed_f(change.percentage),
            previous,
            current,
            hours
        ),
        _ => format!("| {} | n/a | n/a | n/a | n/a |\n", label),
    }
}

fn generate_period_section(change_12h: &PeriodChange, change_24h: &PeriodChange) -> String {
    let mut section = String::new();

    section.push_str("## Recent Changes\n\n");
    section.push_str("| Period | Change | Change % | Followers | Covered |\n");
    section.push_str("|:---|---:|---:|:---|---:|\n");
    section.push_str(&period_row("12h", change_12h));
    section.push_str(&period_row("24h", change_24h));
    section.push('\n');

    section
}

fn generate_rolling_section(rolling: &RollingAverage) -> String {
    let mut section = String::new();

    section.push_str("## 7-Day Rolling Average\n\n");
    if rolling.data_points == 0 {
        section.push_str("Not enough data for a rolling average.\n\n");
        return section;
    }

    section.push_str(&format!(
        "- **Average Daily Change:** {}\n",
        signed_f(rolling.average_change)
    ));
    if let Some(total) = rolling.total_change {
        section.push_str(&format!("- **Total Change:** {}\n", signed_f(total)));
    }
    if let Some(days) = rolling.days_covered {
        section.push_str(&format!("- **Days Covered:** {}\n", days));
    }
    if let (Some(from), Some(to)) = (rolling.from_date, rolling.to_date) {
        section.push_str(&format!("- **Window:** {} to {}\n", from, to));
    }
    section.push_str(&format!("- **Snapshots:** {}\n\n", rolling.data_points));

    section
}

fn generate_scrapes_section(changes: &[ScrapeChange]) -> String {
    let mut section = String::new();

    section.push_str("## Changes Between Scrapes\n\n");
    if changes.is_empty() {
        section.push_str("No consecutive scrapes in this window.\n\n");
        return section;
    }

    section.push_str("| From | To | Followers | Change | Hours |\n");
    section.push_str("|:---|:---|:---|---:|---:|\n");
    for change in changes {
        section.push_str(&format!(
            "| {} | {} | {} → {} | {} | {:.1} |\n",
            timestamp(change.previous_timestamp),
            timestamp(change.current_timestamp),
            change.previous_count,
            change.current_count,
            signed(change.change),
            change.hours_between
        ));
    }
    section.push('\n');

    section
}

impl MarkdownReport for GrowthMetrics {
    fn title(&self) -> String {
        format!("Growth Report: {}", self.username)
    }

    fn body(&self) -> String {
        let mut body = String::new();

        body.push_str("## Overview\n\n");
        body.push_str(&format!(
            "- **Period:** {} to {}\n",
            timestamp(self.start_date),
            timestamp(self.end_date)
        ));
        body.push_str(&format!(
            "- **Followers:** {} → {}\n",
            self.start_followers, self.end_followers
        ));
        body.push_str(&format!("- **Net Growth:** {}\n", signed(self.net_growth)));
        body.push_str(&format!(
            "- **Growth:** {}%\n",
            signed_f(self.percentage_growth)
        ));
        body.push_str(&format!(
            "- **Average Daily Growth:** {}\n",
            signed_f(self.average_daily_growth)
        ));
        body.push_str(&format!("- **Snapshots:** {}\n\n", self.data_points));

        body.push_str(&generate_period_section(&self.change_12h, &self.change_24h));
        body.push_str(&generate_rolling_section(&self.rolling_avg_7day));
        body.push_str(&generate_scrapes_section(&self.changes_between_scrapes));

        body
    }
}

impl MarkdownReport for FollowerChanges {
    fn title(&self) -> String {
        format!("Follower Changes: {}", self.username)
    }

    fn body(&self) -> String {
        let mut body = String::new();

        body.push_str(&format!(
            "- **Current Followers:** {}\n",
            self.current_followers
        ));
        body.push_str(&format!("- **Snapshots:** {}\n\n", self.data_points));
        body.push_str(&generate_period_section(&self.change_12h, &self.change_24h));
        body.push_str(&generate_scrapes_section(&self.changes_between_scrapes));

        body
    }
}

impl MarkdownReport for RollingAverageView {
    fn title(&self) -> String {
        format!("Rolling Average: {}", self.username)
    }

    fn body(&self) -> String {
        let mut body = format!("- **Current Followers:** {}\n\n", self.current_followers);
        body.push_str(&generate_rolling_section(&self.rolling_avg_7day));
        body
    }
}

impl MarkdownReport for Comparison {
    fn title(&self) -> String {
        format!("Growth Comparison ({} days)", self.comparison_period_days)
    }

    fn body(&self) -> String {
        let mut body = String::new();

        if self.accounts.is_empty() {
            body.push_str("No accounts had enough data to compare.\n\n");
            return body;
        }

        let mut ranked: Vec<&RankedGrowthMetrics> = self.accounts.values().collect();
        ranked.sort_by_key(|entry| entry.rankings.net_growth);

        body.push_str("| # | Account | Followers | Net Growth | Growth % | Daily Growth | % Rank | Daily Rank |\n");
        body.push_str("|:---:|:---|---:|---:|---:|---:|:---:|:---:|\n");
        for entry in ranked {
            let m = &entry.metrics;
            body.push_str(&format!(
                "| {} | {} | {} | {} | {}% | {} | {} | {} |\n",
                entry.rankings.net_growth,
                m.username,
                m.end_followers,
                signed(m.net_growth),
                signed_f(m.percentage_growth),
                signed_f(m.average_daily_growth),
                entry.rankings.percentage_growth,
                entry.rankings.daily_growth
            ));
        }
        body.push('\n');

        body
    }
}

impl MarkdownReport for Snapshot {
    fn title(&self) -> String {
        format!("Profile: {}", self.username)
    }

    fn body(&self) -> String {
        let mut body = String::new();

        if let Some(ref name) = self.full_name {
            body.push_str(&format!("- **Name:** {}\n", name));
        }
        body.push_str(&format!("- **Followers:** {}\n", self.follower_count));
        body.push_str(&format!("- **Checked:** {}\n", timestamp(self.checked_at)));
        if let Some(ref bio) = self.biography {
            body.push_str(&format!("- **Biography:** {}\n", bio));
        }
        body.push('\n');

        body
    }
}

impl MarkdownReport for [Snapshot] {
    fn title(&self) -> String {
        "Profile Snapshots".to_string()
    }

    fn body(&self) -> String {
        let mut body = String::new();

        if self.is_empty() {
            body.push_str("No snapshots recorded.\n\n");
            return body;
        }

        body.push_str("| Account | Followers | Checked |\n");
        body.push_str("|:---|---:|:---|\n");
        for snapshot in self {
            body.push_str(&format!(
                "| {} | {} | {} |\n",
                snapshot.username,
                snapshot.follower_count,
                timestamp(snapshot.checked_at)
            ));
        }
        body.push('\n');

        body
    }
}

impl MarkdownReport for Account {
    fn title(&self) -> String {
        format!("Account: {}", self.username)
    }

    fn body(&self) -> String {
        format!(
            "- **Id:** {}\n- **Status:** {}\n- **Tracked Since:** {}\n\n",
            self.id,
            self.status,
            timestamp(self.created_at)
        )
    }
}

impl MarkdownReport for [Account] {
    fn title(&self) -> String {
        "Tracked Accounts".to_string()
    }

    fn body(&self) -> String {
        let mut body = String::new();

        if self.is_empty() {
            body.push_str("No accounts are tracked.\n\n");
            return body;
        }

        body.push_str("| Id | Account | Status | Tracked Since |\n");
        body.push_str("|---:|:---|:---|:---|\n");
        for account in self {
            body.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                account.id,
                account.username,
                account.status,
                timestamp(account.created_at)
            ));
        }
        body.push('\n');

        body
    }
}

impl MarkdownReport for [ScrapedProfile] {
    fn title(&self) -> String {
        "Scraper: Latest Profiles".to_string()
    }

    fn body(&self) -> String {
        let mut body = String::new();

        if self.is_empty() {
            body.push_str("The scraper returned no profiles.\n\n");
            return body;
        }

        body.push_str("| Account | Name | Followers | Checked |\n");
        body.push_str("|:---|:---|---:|:---|\n");
        for profile in self {
            body.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                profile.username,
                profile.full_name.as_deref().unwrap_or("-"),
                profile.follower_count,
                profile
                    .checked_at
                    .as_deref()
                    .or(profile.timestamp.as_deref())
                    .unwrap_or("-")
            ));
        }
        body.push('\n');

        body
    }
}

impl MarkdownReport for [ScrapedAccount] {
    fn title(&self) -> String {
        "Scraper: Tracked Accounts".to_string()
    }

    fn body(&self) -> String {
        let mut body = String::new();

        if self.is_empty() {
            body.push_str("The scraper is not tracking any accounts.\n\n");
            return body;
        }

        body.push_str("| Account | Status |\n");
        body.push_str("|:---|:---|\n");
        for account in self {
            body.push_str(&format!("| {} | {} |\n", account.username, account.status));
        }
        body.push('\n');

        body
    }
}

impl MarkdownReport for ScraperStatus {
    fn title(&self) -> String {
        "Scraper".to_string()
    }

    fn body(&self) -> String {
        let mark = if self.is_success() { "✅" } else { "❌" };
        format!("{} {}\n\n", mark, self.message)
    }
}

impl MarkdownReport for serde_json::Value {
    fn title(&self) -> String {
        "Scraper Response".to_string()
    }

    fn body(&self) -> String {
        let pretty = serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_string());
        format!("```json\n{}\n```\n\n", pretty)
    }
}
