//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::scraper::client::parse_timestamp;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Longest sample history `seed` will generate.
pub const MAX_SEED_DAYS: i64 = 3650;

/// Followtrack - follower growth analytics for tracked social accounts
///
/// Keeps a local history of follower-count snapshots pulled from a scraper
/// service and reports growth, scrape-to-scrape changes, rolling averages
/// and multi-account rankings.
///
/// Examples:
///   followtrack sync
///   followtrack growth nasa --days 30
///   followtrack changes nasa --format json
///   followtrack compare nasa spacex esa --days 14
///   followtrack init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .followtrack.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the snapshot store (JSON)
    #[arg(long, value_name = "FILE", env = "FOLLOWTRACK_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Scraper service base URL
    #[arg(long, value_name = "URL", env = "SCRAPER_SERVICE_URL", global = true)]
    pub scraper_url: Option<String>,

    /// Scraper request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage tracked accounts in the local store
    Accounts {
        #[command(subcommand)]
        action: AccountsCommand,
    },

    /// Show stored profile snapshots
    Profiles {
        #[command(subcommand)]
        action: ProfilesCommand,
    },

    /// Growth metrics for one account
    Growth {
        username: String,
        /// Number of days to analyze
        #[arg(long, value_name = "DAYS")]
        days: Option<i64>,
        /// Recompute even if a cached result exists
        #[arg(long)]
        refresh: bool,
    },

    /// Scrape-to-scrape follower changes plus 12h/24h changes
    Changes {
        username: String,
        #[arg(long, value_name = "DAYS")]
        days: Option<i64>,
    },

    /// Rolling average of daily follower growth
    RollingAverage {
        username: String,
        #[arg(long, value_name = "DAYS")]
        days: Option<i64>,
    },

    /// Compare and rank growth across accounts
    Compare {
        #[arg(required = true, num_args = 1..)]
        usernames: Vec<String>,
        #[arg(long, value_name = "DAYS")]
        days: Option<i64>,
    },

    /// Talk to the scraper service directly
    Scraper {
        #[command(subcommand)]
        action: ScraperCommand,
    },

    /// Pull the scraper's latest profiles into the local store
    Sync,

    /// Write sample history for demo accounts into the store
    Seed {
        /// Accounts to seed
        #[arg(default_values_t = [String::from("instagram"), String::from("google")])]
        usernames: Vec<String>,
        /// Days of daily history to generate
        #[arg(long, default_value = "30", value_name = "DAYS")]
        days: i64,
    },

    /// Generate a default .followtrack.toml configuration file
    InitConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AccountsCommand {
    /// List tracked accounts
    List {
        #[arg(long, default_value = "0")]
        skip: usize,
        #[arg(long, default_value = "100")]
        limit: usize,
    },
    /// Start tracking an account
    Add { username: String },
    /// Stop tracking an account and drop its history
    Remove { username: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfilesCommand {
    /// Latest snapshot of every account
    Latest,
    /// Latest snapshot of one account
    Current { username: String },
    /// Snapshot history of one account
    History {
        username: String,
        #[arg(long, value_name = "DAYS")]
        days: Option<i64>,
    },
    /// Follower count at or before a point in time
    At {
        username: String,
        /// RFC 3339 or ISO timestamp (UTC when no offset is given)
        timestamp: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommand {
    /// Latest profiles straight from the scraper
    Latest,
    /// Accounts the scraper is tracking
    Accounts,
    /// Trigger a manual scrape
    Trigger,
    /// Ask the scraper to track an account
    AddAccount { username: String },
    /// Ask the scraper to stop tracking an account
    DeleteAccount { username: String },
}

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.scraper_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Scraper URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(days) = self.days() {
            if days < 0 {
                return Err("Days must not be negative".to_string());
            }
        }

        match &self.command {
            Command::Seed { days, .. } if !(1..=MAX_SEED_DAYS).contains(days) => Err(format!(
                "Seed days must be between 1 and {}",
                MAX_SEED_DAYS
            )),
            Command::Profiles {
                action: ProfilesCommand::At { timestamp, .. },
            } if parse_timestamp(timestamp).is_none() => {
                Err(format!("Invalid timestamp: {}", timestamp))
            }
            Command::Accounts {
                action: AccountsCommand::List { limit: 0, .. },
            } => Err("Limit must be at least 1".to_string()),
            _ => Ok(()),
        }
    }

    /// The `--days` value of the selected command, if it has one.
    pub fn days(&self) -> Option<i64> {
        match &self.command {
            Command::Growth { days, .. }
            | Command::Changes { days, .. }
            | Command::RollingAverage { days, .. }
            | Command::Compare { days, .. }
            | Command::Profiles {
                action: ProfilesCommand::History { days, .. },
            } => *days,
            _ => None,
        }
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_default` comes from the configuration file; `--quiet` wins
    /// over it.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
