//! Browser session controller
//!
//! Launches and configures an isolated headless Chromium session with
//! anti-detection fingerprint overrides and selective resource blocking.
//! A session is a scarce, exclusively-owned resource: one live browser
//! process per open session, explicitly closed on every exit path of the
//! owning request so no OS-level process leaks.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, SetBlockedUrLsParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::infrastructure::config::SessionConfig;
use crate::infrastructure::errors::FetchError;
use crate::infrastructure::readiness::PageProbe;

const CHROMIUM_PATH_ENV: &str = "COMMODITY_CRAWLER_CHROMIUM";

/// Locate the Chromium binary: explicit config, env override, PATH lookup,
/// then common install locations.
pub fn find_chromium(config: &SessionConfig) -> Option<PathBuf> {
    if let Some(path) = &config.chromium_path {
        if path.exists() {
            return Some(path.clone());
        }
        warn!("Configured chromium path {} does not exist", path.display());
    }

    if let Ok(raw) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&raw);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// One live remote-controlled browser process
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    session_id: Uuid,
    config: SessionConfig,
}

impl BrowserSession {
    /// Launch a configured browser process. Fails with `LaunchFailure`
    /// when the binary is missing or cannot start; fatal for the current
    /// request and never retried at this layer.
    pub async fn launch(config: &SessionConfig) -> Result<Self, FetchError> {
        let chrome_path = find_chromium(config).ok_or_else(|| {
            FetchError::LaunchFailure(anyhow!(
                "Chromium binary not found (set {} or session.chromium_path)",
                CHROMIUM_PATH_ENV
            ))
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(config.window_width, config.window_height)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            // Drops the most commonly probed automation signal
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--lang=en-US,en")
            .arg(format!("--user-agent={}", config.user_agent));

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| FetchError::LaunchFailure(anyhow!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::LaunchFailure(anyhow!("failed to launch Chromium: {e}")))?;

        // Drain CDP events for the lifetime of the session
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let session_id = Uuid::new_v4();
        info!("Browser session {} launched", session_id);

        Ok(Self {
            browser,
            handler_task,
            session_id,
            config: config.clone(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Open a fresh page configured for extraction: realistic identity,
    /// automation signals suppressed, high-bandwidth resources blocked.
    /// Styles and scripts stay enabled so bot-challenge pages can render.
    pub async fn open_page(&self, navigation_timeout: Duration) -> Result<SessionPage, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::LaunchFailure(anyhow!("failed to open page: {e}")))?;

        self.apply_identity(&page).await;
        self.apply_resource_blocking(&page).await;

        Ok(SessionPage {
            page,
            navigation_timeout,
            current_url: tokio::sync::Mutex::new("about:blank".to_string()),
        })
    }

    /// Best-effort fingerprint overrides; a failure here degrades stealth
    /// but must not fail the request.
    async fn apply_identity(&self, page: &Page) {
        let ua_params = SetUserAgentOverrideParams::builder()
            .user_agent(&self.config.user_agent)
            .accept_language(&self.config.accept_language)
            .platform("Win32")
            .build();

        match ua_params {
            Ok(params) => {
                if let Err(e) = page.execute(params).await {
                    warn!("Failed to override user agent: {}", e);
                }
            }
            Err(e) => warn!("Invalid user agent override params: {}", e),
        }

        // navigator.webdriver / plugins / languages overrides
        if let Err(e) = page.enable_stealth_mode().await {
            warn!("Failed to enable stealth mode: {}", e);
        }
    }

    async fn apply_resource_blocking(&self, page: &Page) {
        if self.config.blocked_url_patterns.is_empty() {
            return;
        }

        if let Err(e) = page.execute(NetworkEnableParams::default()).await {
            warn!("Failed to enable network domain: {}", e);
            return;
        }

        let params = SetBlockedUrLsParams::new(self.config.blocked_url_patterns.clone());
        match page.execute(params).await {
            Ok(_) => debug!(
                "Blocking {} resource URL patterns",
                self.config.blocked_url_patterns.len()
            ),
            Err(e) => warn!("Failed to set blocked URL patterns: {}", e),
        }
    }

    /// Close the browser process. Must run on every exit path.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser session {} close failed: {}", self.session_id, e);
        }
        self.handler_task.abort();
        info!("Browser session {} closed", self.session_id);
    }
}

/// A configured page within a session
pub struct SessionPage {
    page: Page,
    navigation_timeout: Duration,
    current_url: tokio::sync::Mutex<String>,
}

impl SessionPage {
    /// Navigate and wait for the load to settle, bounded by the
    /// per-navigation timeout. A timeout yields `NavigationTimeout`;
    /// callers degrade to reading whatever markup is present instead of
    /// aborting the request.
    pub async fn navigate(&self, url: &str) -> Result<(), FetchError> {
        {
            let mut current = self.current_url.lock().await;
            *current = url.to_string();
        }

        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| FetchError::LaunchFailure(anyhow!("navigation failed: {e}")))?;
            let _ = self.page.wait_for_navigation().await;
            Ok::<(), FetchError>(())
        };

        match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::NavigationTimeout {
                url: url.to_string(),
                timeout: self.navigation_timeout,
            }),
        }
    }

    pub async fn close(self) {
        let _ = self.page.close().await;
    }
}

#[async_trait]
impl PageProbe for SessionPage {
    async fn markup(&self) -> Result<String, FetchError> {
        self.page
            .content()
            .await
            .map_err(|e| FetchError::LaunchFailure(anyhow!("failed to read page content: {e}")))
    }

    async fn reload(&self) -> Result<(), FetchError> {
        self.page
            .reload()
            .await
            .map_err(|e| FetchError::LaunchFailure(anyhow!("reload failed: {e}")))?;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn selector_exists(&self, selector: &str) -> Result<bool, FetchError> {
        // Escape via JSON so arbitrary selectors survive the JS round trip
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string())
        );
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| FetchError::LaunchFailure(anyhow!("selector probe failed: {e}")))?;

        Ok(result.into_value::<bool>().unwrap_or(false))
    }

    fn url(&self) -> String {
        self.current_url
            .try_lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|_| "<unknown>".to_string())
    }
}
