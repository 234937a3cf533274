//! Configuration loaded from `dualis.toml` and `DUALIS_*` environment variables.

use crate::dualis::{CrawlConfig, Credentials, DEFAULT_BASE_URL};
use crate::fmt::{opt, redacted};
use anyhow::{Context, Result};
use custom_debug_derive::Debug;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    #[debug(skip_if = Option::is_none, with = opt)]
    pub username: Option<String>,
    #[serde(default)]
    #[debug(with = redacted)]
    pub password: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout", deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_crawl_timeout", deserialize_with = "deserialize_duration")]
    pub crawl_timeout: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff", deserialize_with = "deserialize_duration")]
    pub retry_backoff: Duration,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// Where change notifications go; no notification when unset.
    #[serde(default)]
    #[debug(skip_if = Option::is_none, with = opt)]
    pub notify_email: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_crawl_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_concurrency() -> usize {
    1
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

/// Parse `"30s"`, `"500ms"`, `"5m"` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(input.trim())
        .with_context(|| format!("invalid duration {input:?}"))?;
    Duration::try_from(parsed).with_context(|| format!("duration out of range: {input:?}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Load from the default sources: `dualis.toml` (optional), then the environment.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("dualis.toml"))
                .merge(Env::prefixed("DUALIS_")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().context("Failed to load config")
    }

    pub fn crawl_config(&self) -> Result<CrawlConfig> {
        let base_url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base_url {:?}", self.base_url))?;
        Ok(CrawlConfig {
            base_url,
            request_timeout: self.request_timeout,
            crawl_timeout: self.crawl_timeout,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
            concurrency: self.concurrency.max(1),
        })
    }

    /// Credentials from config, with an optional username override.
    pub fn credentials(&self, username_override: Option<&str>) -> Result<Credentials> {
        let username = username_override
            .map(str::to_owned)
            .or_else(|| self.username.clone())
            .context("no username configured (set DUALIS_USERNAME or pass --username)")?;
        let password = self
            .password
            .clone()
            .context("no password configured (set DUALIS_PASSWORD)")?;
        Ok(Credentials::new(username, password))
    }
}
