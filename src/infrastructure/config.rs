//! Configuration infrastructure
//!
//! Contains configuration loading and management for the acquisition
//! pipeline. All settings are serde-backed with conservative defaults so
//! the crawler runs without a config file; an optional JSON file under the
//! platform config directory overrides them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::domain::{BunkerType, Category};

const CONFIG_DIR_NAME: &str = "commodity-crawler";
const CONFIG_FILE_NAME: &str = "config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser session settings
    pub session: SessionConfig,
    /// Target site URLs and readiness tuning
    pub targets: TargetConfig,
    /// Batch sizing and pacing
    pub fetch: FetchConfig,
    /// Local/remote acquisition tier settings
    pub tiers: TierConfig,
    /// Price cache settings
    pub cache: CacheConfig,
    /// Scrape-service HTTP settings
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Browser session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Explicit Chromium binary path; discovery runs when empty
    pub chromium_path: Option<PathBuf>,
    /// Desktop user agent presented to target sites
    pub user_agent: String,
    /// Accept-Language header and navigator.languages override
    pub accept_language: String,
    pub window_width: u32,
    pub window_height: u32,
    pub headless: bool,
    /// URL patterns blocked per page. Images, fonts and media only;
    /// styles and scripts stay enabled so bot-challenge pages can render.
    pub blocked_url_patterns: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chromium_path: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            window_width: 1920,
            window_height: 1080,
            headless: true,
            blocked_url_patterns: vec![
                "*.png".to_string(),
                "*.jpg".to_string(),
                "*.jpeg".to_string(),
                "*.gif".to_string(),
                "*.webp".to_string(),
                "*.svg".to_string(),
                "*.ico".to_string(),
                "*.woff".to_string(),
                "*.woff2".to_string(),
                "*.ttf".to_string(),
                "*.otf".to_string(),
                "*.mp4".to_string(),
                "*.webm".to_string(),
                "*.mp3".to_string(),
            ],
        }
    }
}

/// Target site URLs and per-family readiness tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the category table site
    pub category_base_url: String,
    /// Symbol page URL template; `{symbol}` is substituted
    pub symbol_url_template: String,
    /// Bunker prices page; `{grade}` is substituted
    pub bunker_url_template: String,
    /// EMEA regional bunker overview page
    pub bunker_emea_url: String,

    /// Navigation timeout per page load, seconds (10-30 depending on target)
    pub navigation_timeout_secs: u64,
    /// Readiness-selector wait for category table pages, seconds
    pub category_readiness_timeout_secs: u64,
    /// Readiness-selector wait for single-symbol pages, seconds
    pub symbol_readiness_timeout_secs: u64,
    /// Readiness-selector wait for bunker pages, seconds
    pub bunker_readiness_timeout_secs: u64,
    /// Grace wait after a readiness timeout before reading markup anyway, ms
    pub fallback_grace_ms: u64,
    /// Cooldown before the single challenge-recovery reload, ms
    pub challenge_cooldown_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            category_base_url: "https://tradingeconomics.com/commodities".to_string(),
            symbol_url_template: "https://www.tradingview.com/symbols/{symbol}/".to_string(),
            bunker_url_template: "https://shipandbunker.com/prices#{grade}".to_string(),
            bunker_emea_url: "https://shipandbunker.com/prices/emea".to_string(),
            navigation_timeout_secs: 25,
            category_readiness_timeout_secs: 8,
            symbol_readiness_timeout_secs: 10,
            bunker_readiness_timeout_secs: 6,
            fallback_grace_ms: 3000,
            challenge_cooldown_ms: 5000,
        }
    }
}

impl TargetConfig {
    pub fn category_url(&self, category: Category) -> String {
        format!("{}/{}", self.category_base_url.trim_end_matches('/'), category)
    }

    pub fn symbol_url(&self, symbol: &str) -> String {
        self.symbol_url_template.replace("{symbol}", symbol)
    }

    pub fn bunker_url(&self, bunker_type: BunkerType) -> String {
        self.bunker_url_template.replace("{grade}", bunker_type.as_str())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Batch sizing and pacing for multi-page categories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Symbols per batch (3-5); one browser session is reused per batch run
    pub batch_size: usize,
    /// Bounded fan-out within a batch
    pub batch_concurrency: usize,
    /// Pacing delay between batches, ms
    pub batch_pause_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_concurrency: 3,
            batch_pause_ms: 1500,
        }
    }
}

impl FetchConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// Acquisition tier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Upper bound on one local-tier (owned browser) acquisition
    pub local_request_timeout_secs: u64,
    /// Base URL of the remote managed scrape service
    pub remote_base_url: String,
    /// HTTP timeout toward the remote service
    pub remote_timeout_secs: u64,
    /// Token-bucket rate toward the remote service
    pub remote_max_requests_per_second: u32,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            local_request_timeout_secs: 45,
            remote_base_url: "https://commodity-scraper.fly.dev".to_string(),
            remote_timeout_secs: 30,
            remote_max_requests_per_second: 4,
        }
    }
}

impl TierConfig {
    pub fn local_request_timeout(&self) -> Duration {
        Duration::from_secs(self.local_request_timeout_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

/// Price cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live, seconds. 24 hours by default.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 24 * 60 * 60 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Scrape-service HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    /// Enable console output
    pub console_output: bool,
    /// Enable file output
    pub file_output: bool,
    /// Module-specific log level filters (e.g. "chromiumoxide": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_filters = HashMap::new();
        // Chatty dependencies that drown out pipeline logs below TRACE
        module_filters.insert("chromiumoxide".to_string(), "warn".to_string());
        module_filters.insert("hyper".to_string(), "warn".to_string());
        module_filters.insert("reqwest".to_string(), "warn".to_string());
        module_filters.insert("html5ever".to_string(), "error".to_string());

        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: true,
            module_filters,
        }
    }
}

impl AppConfig {
    /// Platform config file path (e.g. ~/.config/commodity-crawler/config.json)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the platform config file, falling back to
    /// defaults when the file is missing.
    pub async fn load_or_default() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            info!("No platform config directory available, using default configuration");
            return Ok(Self::default());
        };

        if !path.exists() {
            info!("Config file {} not found, using default configuration", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Persist the configuration as pretty-printed JSON.
    pub async fn save(&self) -> Result<()> {
        let path = Self::config_path().context("No platform config directory available")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let raw = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, raw)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }
}
