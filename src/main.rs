//! Followtrack - follower growth analytics
//!
//! A CLI that keeps a local history of follower-count snapshots pulled from
//! a scraper service and reports growth, changes and rankings over it.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, store, scraper) or nothing found

mod analysis;
mod cache;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scraper;
mod service;
mod store;

use anyhow::{bail, Context, Result};
use cache::MetricsCache;
use chrono::Utc;
use cli::{AccountsCommand, Args, Command, OutputFormat, ProfilesCommand, ScraperCommand};
use config::{AnalyticsConfig, Config, CONFIG_FILE};
use report::MarkdownReport;
use scraper::client::parse_timestamp;
use scraper::{ScraperClient, ScraperConfig};
use serde::Serialize;
use service::{AnalyticsService, CacheTtl};
use std::path::{Path, PathBuf};
use store::{sample_history, JsonStore};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Load configuration before logging so it can set the default level
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("Followtrack v{}", env!("CARGO_PKG_VERSION"));
    match config_source {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .followtrack.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the store path, scraper URL, cache lifetimes and windows.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Where and how results are written.
struct Output {
    format: OutputFormat,
    path: Option<PathBuf>,
}

impl Output {
    fn emit<R: MarkdownReport + Serialize + ?Sized>(&self, result: &R) -> Result<()> {
        let content = match self.format {
            OutputFormat::Json => report::generate_json_report(result)?,
            OutputFormat::Markdown => report::generate_markdown_report(result),
        };

        report::write_report(&content, self.path.as_deref())?;
        if let Some(ref path) = self.path {
            info!("Report saved to: {}", path.display());
        }
        Ok(())
    }
}

/// Run the selected command.
async fn run(args: Args, config: Config) -> Result<()> {
    let format = args.format.unwrap_or(if config.general.json {
        OutputFormat::Json
    } else {
        OutputFormat::Markdown
    });
    let output = Output {
        format,
        path: args.output.clone(),
    };

    match args.command {
        Command::Scraper { action } => run_scraper(action, &config, &output).await,
        Command::Sync => {
            let client = scraper_client(&config)?;
            let mut service = open_service(&config)?;
            let recorded = scraper::sync_latest(&client, &mut service).await?;
            println!(
                "✅ Synced {} profiles from {}",
                recorded, config.scraper.url
            );
            Ok(())
        }
        command => {
            let mut service = open_service(&config)?;
            run_local(command, &mut service, &config.analytics, &output)
        }
    }
}

/// Commands answered from the local store.
fn run_local(
    command: Command,
    service: &mut AnalyticsService<JsonStore>,
    defaults: &AnalyticsConfig,
    output: &Output,
) -> Result<()> {
    match command {
        Command::Accounts { action } => match action {
            AccountsCommand::List { skip, limit } => {
                output.emit(service.accounts(skip, limit)?.as_slice())
            }
            AccountsCommand::Add { username } => output.emit(&service.add_account(&username)?),
            AccountsCommand::Remove { username } => {
                service.remove_account(&username)?;
                println!("✅ Stopped tracking {}", username);
                Ok(())
            }
        },
        Command::Profiles { action } => match action {
            ProfilesCommand::Latest => output.emit(service.latest_profiles()?.as_slice()),
            ProfilesCommand::Current { username } => {
                output.emit(&service.current_profile(&username)?)
            }
            ProfilesCommand::History { username, days } => {
                let days = days.unwrap_or(defaults.history_days);
                output.emit(service.history(&username, days)?.as_slice())
            }
            ProfilesCommand::At {
                username,
                timestamp,
            } => {
                let target = parse_timestamp(&timestamp)
                    .with_context(|| format!("Invalid timestamp: {}", timestamp))?;
                output.emit(&service.followers_at(&username, target)?)
            }
        },
        Command::Growth {
            username,
            days,
            refresh,
        } => {
            let days = days.unwrap_or(defaults.growth_days);
            output.emit(&service.growth(&username, days, refresh)?)
        }
        Command::Changes { username, days } => {
            let days = days.unwrap_or(defaults.changes_days);
            output.emit(&service.changes(&username, days)?)
        }
        Command::RollingAverage { username, days } => {
            let days = days.unwrap_or(defaults.rolling_days);
            output.emit(&service.rolling_average(&username, days)?)
        }
        Command::Compare { usernames, days } => {
            let days = days.unwrap_or(defaults.compare_days);
            output.emit(&service.compare(&usernames, days)?)
        }
        Command::Seed { usernames, days } => {
            let now = Utc::now();
            let snapshots = usernames
                .iter()
                .enumerate()
                .flat_map(|(index, username)| sample_history(username, index, days, now))
                .collect();
            let recorded = service.ingest(snapshots)?;
            println!(
                "✅ Seeded {} snapshots for {} accounts",
                recorded,
                usernames.len()
            );
            Ok(())
        }
        other => bail!("{:?} does not run against the local store", other),
    }
}

/// Commands proxied to the scraper service.
async fn run_scraper(action: ScraperCommand, config: &Config, output: &Output) -> Result<()> {
    let client = scraper_client(config)?;

    match action {
        ScraperCommand::Latest => {
            let profiles = client.fetch_latest_profiles().await?;
            output.emit(profiles.as_slice())?;
        }
        ScraperCommand::Accounts => {
            let accounts = client.fetch_accounts().await?;
            output.emit(accounts.as_slice())?;
        }
        ScraperCommand::Trigger => {
            let response = client.trigger_scrape().await?;
            output.emit(&response)?;
        }
        ScraperCommand::AddAccount { username } => {
            let status = client.add_account(&username).await?;
            output.emit(&status)?;
            if !status.is_success() {
                bail!("{}", status.message);
            }
        }
        ScraperCommand::DeleteAccount { username } => {
            let response = client.delete_account(&username).await?;
            output.emit(&response)?;
        }
    }

    Ok(())
}

fn scraper_client(config: &Config) -> Result<ScraperClient> {
    debug!("Scraper at {}", config.scraper.url);
    ScraperClient::new(ScraperConfig::from(&config.scraper))
        .context("Failed to build scraper client")
}

fn open_service(config: &Config) -> Result<AnalyticsService<JsonStore>> {
    let store = JsonStore::open(&config.store.path)
        .with_context(|| format!("Failed to open store {}", config.store.path.display()))?;
    info!("Using store: {}", store.path().display());

    let cache_path = config.store.cache_path();
    debug!("Using cache: {}", cache_path.display());
    let cache = MetricsCache::open(cache_path, Utc::now());

    Ok(AnalyticsService::new(store, CacheTtl::from(&config.cache)).with_cache(cache))
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go to stderr directly.
/// Returns the file the configuration came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok((Config::default(), None))
        }
    }
}
