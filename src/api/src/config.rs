//! Configuration for the events API.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Events page configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing page to scrape
    #[serde(default = "default_source_url")]
    pub url: String,
    /// Prefix for links of cards that carry no href; the event id is appended
    #[serde(default = "default_event_link_base")]
    pub event_link_base: String,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_selector_timeout_secs")]
    pub selector_timeout_secs: u64,
    /// Chrome binary; falls back to the usual install path for the OS
    #[serde(default)]
    pub chrome_executable: Option<String>,
}

fn default_source_url() -> String {
    crate::scraper::SOURCE_URL.to_string()
}

fn default_event_link_base() -> String {
    crate::scraper::EVENT_LINK_BASE.to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_selector_timeout_secs() -> u64 {
    10
}

impl SourceConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            event_link_base: default_event_link_base(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            selector_timeout_secs: default_selector_timeout_secs(),
            chrome_executable: None,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age below which cached events are served without a refresh
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
    /// Fill the cache in the background at startup
    #[serde(default)]
    pub prefetch_on_start: bool,
}

fn default_freshness_secs() -> u64 {
    60 * 60
}

impl CacheConfig {
    pub fn freshness(&self) -> anyhow::Result<chrono::Duration> {
        i64::try_from(self.freshness_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                anyhow::anyhow!("cache.freshness_secs out of range: {}", self.freshness_secs)
            })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
            prefetch_on_start: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (EVENTS_SERVER__PORT,
            // EVENTS_CACHE__FRESHNESS_SECS, etc.)
            .add_source(
                config::Environment::with_prefix("EVENTS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.cache.freshness()?;

        Ok(config)
    }
}
