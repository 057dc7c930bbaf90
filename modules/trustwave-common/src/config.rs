use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

/// Tunables for trust computation and aggregation, loaded from environment
/// variables. Every variable is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // Trust graph
    pub expand_depth1: bool,
    pub wot_batch_size: usize,
    pub wot_timeout: Duration,
    pub wot_ttl: Duration,

    // Aggregation
    pub author_batch_size: usize,
    pub per_batch_limit: usize,
    pub items_timeout: Duration,
    pub author_timeout: Duration,
    pub lists_timeout: Duration,
    pub list_timeout: Duration,

    // Cache freshness
    pub items_ttl: Duration,
    pub lists_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expand_depth1: true,
            wot_batch_size: 50,
            wot_timeout: Duration::from_secs(10),
            wot_ttl: Duration::from_secs(300),
            author_batch_size: 100,
            per_batch_limit: 100,
            items_timeout: Duration::from_secs(8),
            author_timeout: Duration::from_secs(5),
            lists_timeout: Duration::from_secs(3),
            list_timeout: Duration::from_secs(2),
            items_ttl: Duration::from_secs(30),
            lists_ttl: Duration::from_secs(120),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// `Config::default()` for anything unset.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            expand_depth1: parsed_env("TRUSTWAVE_EXPAND_DEPTH1", d.expand_depth1)?,
            wot_batch_size: parsed_env("TRUSTWAVE_WOT_BATCH_SIZE", d.wot_batch_size)?,
            wot_timeout: millis_env("TRUSTWAVE_WOT_TIMEOUT_MS", d.wot_timeout)?,
            wot_ttl: secs_env("TRUSTWAVE_WOT_TTL_SECS", d.wot_ttl)?,
            author_batch_size: parsed_env("TRUSTWAVE_AUTHOR_BATCH_SIZE", d.author_batch_size)?,
            per_batch_limit: parsed_env("TRUSTWAVE_PER_BATCH_LIMIT", d.per_batch_limit)?,
            items_timeout: millis_env("TRUSTWAVE_ITEMS_TIMEOUT_MS", d.items_timeout)?,
            author_timeout: millis_env("TRUSTWAVE_AUTHOR_TIMEOUT_MS", d.author_timeout)?,
            lists_timeout: millis_env("TRUSTWAVE_LISTS_TIMEOUT_MS", d.lists_timeout)?,
            list_timeout: millis_env("TRUSTWAVE_LIST_TIMEOUT_MS", d.list_timeout)?,
            items_ttl: secs_env("TRUSTWAVE_ITEMS_TTL_SECS", d.items_ttl)?,
            lists_ttl: secs_env("TRUSTWAVE_LISTS_TTL_SECS", d.lists_ttl)?,
        })
    }

    /// Log the effective configuration.
    pub fn log_summary(&self) {
        info!(
            expand_depth1 = self.expand_depth1,
            wot_batch_size = self.wot_batch_size,
            author_batch_size = self.author_batch_size,
            per_batch_limit = self.per_batch_limit,
            wot_timeout_ms = self.wot_timeout.as_millis() as u64,
            items_timeout_ms = self.items_timeout.as_millis() as u64,
            wot_ttl_secs = self.wot_ttl.as_secs(),
            items_ttl_secs = self.items_ttl.as_secs(),
            lists_ttl_secs = self.lists_ttl.as_secs(),
            "Trust configuration loaded"
        );
    }
}

fn parsed_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid value, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn millis_env(key: &str, default: Duration) -> Result<Duration> {
    parsed_env(key, default.as_millis() as u64).map(Duration::from_millis)
}

fn secs_env(key: &str, default: Duration) -> Result<Duration> {
    parsed_env(key, default.as_secs()).map(Duration::from_secs)
}
