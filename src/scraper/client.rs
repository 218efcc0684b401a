//! HTTP client for the external scraper service.

use crate::error::ScraperError;
use crate::models::Snapshot;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the scraper client.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Timeout for reads and account changes.
    pub timeout_seconds: u64,
    /// Timeout for a manual scrape, which does the actual crawling.
    pub trigger_timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout_seconds: 10,
            trigger_timeout_seconds: 30,
        }
    }
}

/// Profile record as reported by the scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProfile {
    pub username: String,
    pub follower_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
    /// Older scraper builds report the observation time under this name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ScrapedProfile {
    /// Converts to a snapshot, stamping it with `fallback` when the record
    /// carries no readable time.
    pub fn into_snapshot(self, fallback: DateTime<Utc>) -> Snapshot {
        let checked_at = self
            .checked_at
            .as_deref()
            .or(self.timestamp.as_deref())
            .and_then(parse_timestamp)
            .unwrap_or(fallback);

        Snapshot {
            username: self.username,
            follower_count: self.follower_count,
            checked_at,
            full_name: self.full_name,
            profile_pic_url: self.profile_pic_url,
            biography: self.biography,
        }
    }
}

/// Account record as reported by the scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedAccount {
    pub username: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_status() -> String {
    "active".to_string()
}

/// Outcome of an account change on the scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperStatus {
    pub status: String,
    pub message: String,
}

impl ScraperStatus {
    fn success(message: String) -> Self {
        Self {
            status: "success".to_string(),
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Default, Deserialize)]
struct AddAccountsResponse {
    #[serde(default)]
    added: Vec<String>,
    #[serde(default)]
    skipped: Vec<SkippedAccount>,
}

#[derive(Debug, Deserialize)]
struct SkippedAccount {
    username: String,
    #[serde(default)]
    reason: String,
}

/// Parses RFC 3339, or a naive ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Pulls a record list out of a bare array or an object wrapping it under `key`.
fn extract_list(payload: Value, key: &str) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => {
                warn!("Unexpected {} payload: object without a '{}' list", key, key);
                Vec::new()
            }
        },
        other => {
            warn!("Unexpected {} payload type: {}", key, other);
            Vec::new()
        }
    }
}

fn decode_records<T: for<'de> Deserialize<'de>>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} record: {}", what, e);
                None
            }
        })
        .collect()
}

/// Client for the scraper service REST API.
pub struct ScraperClient {
    config: ScraperConfig,
    http_client: reqwest::Client,
}

impl ScraperClient {
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `/accounts/{username}`, with the username encoded as one path segment.
    fn account_url(&self, username: &str) -> Result<Url, ScraperError> {
        let invalid = || ScraperError::InvalidUrl(self.config.base_url.clone());
        let mut url = Url::parse(&self.url("/accounts")).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push(username);
        Ok(url)
    }

    /// Sends a request and decodes the JSON body.
    async fn send(&self, request: RequestBuilder, timeout_seconds: u64) -> Result<Value, ScraperError> {
        let response = request
            .timeout(Duration::from_secs(timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScraperError::Timeout(timeout_seconds)
                } else if e.is_connect() {
                    ScraperError::Connect(self.config.base_url.clone())
                } else {
                    ScraperError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScraperError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    /// Latest profile data for all tracked accounts.
    pub async fn fetch_latest_profiles(&self) -> Result<Vec<ScrapedProfile>, ScraperError> {
        let url = self.url("/profiles");
        info!("Fetching profiles from {}", url);

        let payload = self
            .send(self.http_client.get(&url), self.config.timeout_seconds)
            .await?;
        let profiles = decode_records(extract_list(payload, "profiles"), "profile");
        debug!("Received {} profiles", profiles.len());
        Ok(profiles)
    }

    /// Accounts tracked by the scraper.
    pub async fn fetch_accounts(&self) -> Result<Vec<ScrapedAccount>, ScraperError> {
        let url = self.url("/accounts");
        info!("Fetching accounts from {}", url);

        let payload = self
            .send(self.http_client.get(&url), self.config.timeout_seconds)
            .await?;
        Ok(decode_records(extract_list(payload, "accounts"), "account"))
    }

    /// Asks the scraper to crawl every account now.
    pub async fn trigger_scrape(&self) -> Result<Value, ScraperError> {
        let url = self.url("/scrape-accounts");
        info!("Triggering scrape at {}", url);

        self.send(
            self.http_client.post(&url),
            self.config.trigger_timeout_seconds,
        )
        .await
    }

    /// Starts tracking an account on the scraper.
    pub async fn add_account(&self, username: &str) -> Result<ScraperStatus, ScraperError> {
        let url = self.url("/accounts");
        info!("Adding account {} at {}", username, url);

        let payload = json!({ "accounts": [{ "username": username }] });
        let body = self
            .send(
                self.http_client.post(&url).json(&payload),
                self.config.timeout_seconds,
            )
            .await?;

        let result: AddAccountsResponse = match serde_json::from_value(body) {
            Ok(result) => result,
            Err(e) => {
                warn!("Unreadable add-account response for {}: {}", username, e);
                AddAccountsResponse::default()
            }
        };
        if result.added.iter().any(|added| added == username) {
            return Ok(ScraperStatus::success(format!(
                "Successfully added account: {}",
                username
            )));
        }

        let reason = result
            .skipped
            .into_iter()
            .find(|s| s.username == username)
            .map(|s| s.reason)
            .unwrap_or_else(|| "Unknown reason".to_string());
        Ok(ScraperStatus::error(format!("Account not added: {}", reason)))
    }

    /// Stops tracking an account on the scraper.
    pub async fn delete_account(&self, username: &str) -> Result<Value, ScraperError> {
        let url = self.account_url(username)?;
        info!("Deleting account {} at {}", username, url);

        self.send(self.http_client.delete(url), self.config.timeout_seconds)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ScraperClient {
        ScraperClient::new(ScraperConfig {
            base_url: server.uri(),
            ..ScraperConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 4, 2, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-04-02T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-04-02T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-04-02T10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-04-02 10:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-04-02T10:30:00.250"),
            Some(expected + chrono::Duration::milliseconds(250))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_into_snapshot_prefers_checked_at() {
        let fallback = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let profile: ScrapedProfile = serde_json::from_value(json!({
            "username": "nasa",
            "follower_count": 99,
            "checked_at": "2024-04-02T10:30:00",
            "timestamp": "2020-01-01T00:00:00"
        }))
        .unwrap();
        let snapshot = profile.into_snapshot(fallback);
        assert_eq!(
            snapshot.checked_at,
            Utc.with_ymd_and_hms(2024, 4, 2, 10, 30, 0).unwrap()
        );

        let undated: ScrapedProfile =
            serde_json::from_value(json!({"username": "nasa", "follower_count": 99})).unwrap();
        assert_eq!(undated.into_snapshot(fallback).checked_at, fallback);
    }

    #[test]
    fn test_extract_list_shapes() {
        assert_eq!(extract_list(json!([1, 2]), "profiles").len(), 2);
        assert_eq!(extract_list(json!({"profiles": [1]}), "profiles").len(), 1);
        assert!(extract_list(json!({"other": [1]}), "profiles").is_empty());
        assert!(extract_list(json!("nope"), "profiles").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_latest_profiles_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profiles": [
                    {"username": "a", "follower_count": 10, "checked_at": "2024-04-02T10:30:00Z"},
                    {"username": "broken"},
                    {"username": "b", "follower_count": 20}
                ]
            })))
            .mount(&server)
            .await;

        let profiles = client_for(&server).fetch_latest_profiles().await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].username, "a");
        assert_eq!(profiles[1].follower_count, 20);
    }

    #[tokio::test]
    async fn test_fetch_accounts_bare_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"username": "a"}])),
            )
            .mount(&server)
            .await;

        let accounts = client_for(&server).fetch_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].status, "active");
    }

    #[tokio::test]
    async fn test_add_account_added_and_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts"))
            .and(body_json(json!({"accounts": [{"username": "fresh"}]})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"added": ["fresh"], "skipped": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/accounts"))
            .and(body_json(json!({"accounts": [{"username": "dupe"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "added": [],
                "skipped": [{"username": "dupe", "reason": "already exists"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let added = client.add_account("fresh").await.unwrap();
        assert!(added.is_success());
        assert_eq!(added.message, "Successfully added account: fresh");

        let skipped = client.add_account("dupe").await.unwrap();
        assert!(!skipped.is_success());
        assert_eq!(skipped.message, "Account not added: already exists");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape-accounts"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = client_for(&server).trigger_scrape().await.unwrap_err();
        match err {
            ScraperError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_account() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/accounts/gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "deleted"})))
            .mount(&server)
            .await;

        let body = client_for(&server).delete_account("gone").await.unwrap();
        assert_eq!(body["status"], "deleted");
    }

    #[tokio::test]
    async fn test_delete_account_encodes_username() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/accounts/a%2Fb%3Fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "deleted"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server).delete_account("a/b?x").await.unwrap();
        assert_eq!(body["status"], "deleted");
    }

    #[test]
    fn test_account_url_under_base_path() {
        let client = ScraperClient::new(ScraperConfig {
            base_url: "http://scraper.local/api/".to_string(),
            ..ScraperConfig::default()
        })
        .unwrap();
        let url = client.account_url("first last").unwrap();
        assert_eq!(url.as_str(), "http://scraper.local/api/accounts/first%20last");
    }

    #[test]
    fn test_account_url_rejects_unparseable_base() {
        let client = ScraperClient::new(ScraperConfig {
            base_url: "not a url".to_string(),
            ..ScraperConfig::default()
        })
        .unwrap();
        assert!(matches!(
            client.account_url("a"),
            Err(ScraperError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_add_account_unreadable_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"added": "fresh"})))
            .mount(&server)
            .await;

        let status = client_for(&server).add_account("fresh").await.unwrap();
        assert!(!status.is_success());
        assert_eq!(status.message, "Account not added: Unknown reason");
    }
}
