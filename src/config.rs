//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.followtrack.toml` files.

use crate::scraper::ScraperConfig;
use crate::service::CacheTtl;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".followtrack.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Snapshot store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Scraper service settings.
    #[serde(default)]
    pub scraper: ScraperSettings,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Default analytics windows.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Emit JSON instead of Markdown by default.
    #[serde(default)]
    pub json: bool,
}

/// Snapshot store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON store document.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    /// The cache document kept next to the store, e.g. `followtrack.cache.json`.
    pub fn cache_path(&self) -> PathBuf {
        self.path.with_extension("cache.json")
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("followtrack.json")
}

/// Scraper service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    /// Base URL of the scraper service.
    #[serde(default = "default_scraper_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Timeout for a manual scrape in seconds.
    #[serde(default = "default_trigger_timeout")]
    pub trigger_timeout_seconds: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            url: default_scraper_url(),
            timeout_seconds: default_timeout(),
            trigger_timeout_seconds: default_trigger_timeout(),
        }
    }
}

fn default_scraper_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_trigger_timeout() -> u64 {
    30
}

impl From<&ScraperSettings> for ScraperConfig {
    fn from(settings: &ScraperSettings) -> Self {
        Self {
            base_url: settings.url.clone(),
            timeout_seconds: settings.timeout_seconds,
            trigger_timeout_seconds: settings.trigger_timeout_seconds,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of cached growth metrics in seconds.
    #[serde(default = "default_growth_ttl")]
    pub growth_ttl_seconds: u64,

    /// Lifetime of other cached views in seconds.
    #[serde(default = "default_ttl")]
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            growth_ttl_seconds: default_growth_ttl(),
            default_ttl_seconds: default_ttl(),
        }
    }
}

fn default_growth_ttl() -> u64 {
    900 // 15 min
}

fn default_ttl() -> u64 {
    3600
}

impl From<&CacheConfig> for CacheTtl {
    fn from(config: &CacheConfig) -> Self {
        Self {
            growth: Duration::from_secs(config.growth_ttl_seconds),
            default: Duration::from_secs(config.default_ttl_seconds),
        }
    }
}

/// Default windows, in days, for commands that take `--days`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_thirty")]
    pub growth_days: i64,

    #[serde(default = "default_seven")]
    pub changes_days: i64,

    #[serde(default = "default_seven")]
    pub rolling_days: i64,

    #[serde(default = "default_thirty")]
    pub compare_days: i64,

    #[serde(default = "default_thirty")]
    pub history_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            growth_days: 30,
            changes_days: 7,
            rolling_days: 7,
            compare_days: 30,
            history_days: 30,
        }
    }
}

fn default_thirty() -> i64 {
    30
}

fn default_seven() -> i64 {
    7
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line (or via their
    /// environment variables) override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref store) = args.store {
            self.store.path = store.clone();
        }
        if let Some(ref url) = args.scraper_url {
            self.scraper.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.scraper.timeout_seconds = timeout;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
