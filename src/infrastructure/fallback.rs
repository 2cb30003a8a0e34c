//! Acquisition tiers and local-then-remote fallback
//!
//! Two interchangeable ways to resolve a [`ScrapeTarget`] to markup: an
//! owned headless-browser tier and a remote managed scrape service reached
//! over HTTP. [`ResilientMarkupSource`] chains them, preferring the local
//! tier and degrading to the remote one, and only fails a request when
//! both tiers fail.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::infrastructure::config::{SessionConfig, TargetConfig, TierConfig};
use crate::infrastructure::errors::FetchError;
use crate::infrastructure::fetcher::{MarkupSource, ScrapeTarget};
use crate::infrastructure::readiness::ReadinessDetector;
use crate::infrastructure::session::BrowserSession;

/// Local acquisition tier: an owned browser session driven through the
/// readiness detector. The session launches lazily on first use and is
/// reused across fetches until [`shutdown`](Self::shutdown); the owner is
/// responsible for calling shutdown on every exit path.
pub struct BrowserMarkupSource {
    session_config: SessionConfig,
    targets: TargetConfig,
    session: Mutex<Option<BrowserSession>>,
}

impl BrowserMarkupSource {
    pub fn new(session_config: SessionConfig, targets: TargetConfig) -> Self {
        Self {
            session_config,
            targets,
            session: Mutex::new(None),
        }
    }

    /// Close the underlying browser process if one was launched.
    pub async fn shutdown(&self) {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.take() {
            session.close().await;
        }
    }

    async fn acquire_markup(&self, target: &ScrapeTarget) -> Result<String, FetchError> {
        let url = target.url(&self.targets);
        let profile = target.profile(&self.targets);

        let page = {
            let mut guard = self.session.lock().await;
            if guard.is_none() {
                *guard = Some(BrowserSession::launch(&self.session_config).await?);
            }
            let session = guard.as_ref().ok_or_else(|| {
                FetchError::LaunchFailure(anyhow::anyhow!("browser session unavailable"))
            })?;
            session.open_page(self.targets.navigation_timeout()).await?
        };

        // A navigation timeout degrades to reading whatever rendered;
        // partially loaded pages often already carry the price markup.
        match page.navigate(&url).await {
            Ok(()) => {}
            Err(FetchError::NavigationTimeout { url, timeout }) => {
                warn!("Navigation to {} timed out after {:?}, reading partial page", url, timeout);
            }
            Err(e) => {
                page.close().await;
                return Err(e);
            }
        }

        let detector = ReadinessDetector::new(profile);
        let result = detector.wait_for_content(&page).await;
        page.close().await;

        let ready = result?;
        debug!("Local tier read {} chars from {}", ready.markup.len(), url);
        Ok(ready.markup)
    }
}

#[async_trait]
impl MarkupSource for BrowserMarkupSource {
    async fn markup(&self, target: &ScrapeTarget) -> Result<String, FetchError> {
        self.acquire_markup(target).await
    }
}

/// Successful remote-service payload
#[derive(Debug, Deserialize)]
struct RemoteEnvelope {
    data: Option<String>,
    #[allow(dead_code)]
    error: Option<String>,
    message: Option<String>,
}

/// Remote acquisition tier: a managed scrape service exposing the same
/// GET surface this crate serves, rate limited client-side.
pub struct RemoteMarkupSource {
    client: reqwest::Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl RemoteMarkupSource {
    pub fn new(tiers: &TierConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(tiers.remote_timeout())
            .build()?;

        let rate = NonZeroU32::new(tiers.remote_max_requests_per_second.max(1))
            .unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: tiers.remote_base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    fn request(&self, target: &ScrapeTarget) -> reqwest::RequestBuilder {
        match target {
            ScrapeTarget::Category(category) => self
                .client
                .get(format!("{}/scrape/category/{}", self.base_url, category)),
            ScrapeTarget::Symbol(symbol) => self
                .client
                .get(format!("{}/scrape/symbol/{}", self.base_url, symbol)),
            ScrapeTarget::Bunker(bunker_type) => self
                .client
                .get(format!("{}/scrape/bunker", self.base_url))
                .query(&[("type", bunker_type.as_str())]),
            ScrapeTarget::BunkerEmea => self
                .client
                .get(format!("{}/scrape/bunker/emea", self.base_url)),
            ScrapeTarget::Generic(url) => self
                .client
                .get(format!("{}/scrape/generic", self.base_url))
                .query(&[("url", url.as_str())]),
        }
    }
}

#[async_trait]
impl MarkupSource for RemoteMarkupSource {
    async fn markup(&self, target: &ScrapeTarget) -> Result<String, FetchError> {
        self.limiter.until_ready().await;

        let response = self.request(target).send().await?;
        let status = response.status();
        let url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::RemoteStatus {
                status: status.as_u16(),
                url,
            });
        }

        let envelope: RemoteEnvelope =
            response.json().await.map_err(|e| FetchError::MalformedResponse {
                url: url.clone(),
                reason: format!("invalid JSON envelope: {e}"),
            })?;

        match envelope.data {
            Some(markup) => {
                debug!("Remote tier returned {} chars for {}", markup.len(), url);
                Ok(markup)
            }
            None => Err(FetchError::MalformedResponse {
                url,
                reason: envelope
                    .message
                    .unwrap_or_else(|| "envelope missing data field".to_string()),
            }),
        }
    }
}

/// Local-then-remote fallback over two markup sources. The local attempt
/// is bounded by the tier timeout so a wedged browser cannot stall the
/// request past the remote tier's chance to answer.
pub struct ResilientMarkupSource {
    local: Arc<dyn MarkupSource>,
    remote: Arc<dyn MarkupSource>,
    tiers: TierConfig,
}

impl ResilientMarkupSource {
    pub fn new(local: Arc<dyn MarkupSource>, remote: Arc<dyn MarkupSource>, tiers: TierConfig) -> Self {
        Self { local, remote, tiers }
    }
}

#[async_trait]
impl MarkupSource for ResilientMarkupSource {
    async fn markup(&self, target: &ScrapeTarget) -> Result<String, FetchError> {
        let local_timeout = self.tiers.local_request_timeout();

        // Spawned rather than awaited in place: a timed-out attempt is
        // detached, not dropped mid-flight, so the tier runs to completion
        // and releases its page instead of leaking it into the session.
        let local_attempt = {
            let local = Arc::clone(&self.local);
            let target = target.clone();
            tokio::spawn(async move { local.markup(&target).await })
        };

        let local_error = match tokio::time::timeout(local_timeout, local_attempt).await {
            Ok(Ok(Ok(markup))) => return Ok(markup),
            Ok(Ok(Err(e))) => e,
            Ok(Err(join_error)) => {
                FetchError::LaunchFailure(anyhow::anyhow!("local tier task failed: {join_error}"))
            }
            Err(_) => FetchError::NavigationTimeout {
                url: format!("{:?}", target),
                timeout: local_timeout,
            },
        };

        info!("Local tier failed ({}), trying remote tier", local_error);

        match self.remote.markup(target).await {
            Ok(markup) => Ok(markup),
            Err(remote_error) => {
                warn!(
                    "Both acquisition tiers failed: local={}, remote={}",
                    local_error, remote_error
                );
                Err(FetchError::all_tiers(&local_error, &remote_error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_for(server: &MockServer) -> RemoteMarkupSource {
        let tiers = TierConfig {
            remote_base_url: server.uri(),
            remote_max_requests_per_second: 100,
            ..TierConfig::default()
        };
        RemoteMarkupSource::new(&tiers).unwrap()
    }

    #[tokio::test]
    async fn test_remote_unwraps_data_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrape/category/metals"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": "<table>gold</table>" })),
            )
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let markup = remote
            .markup(&ScrapeTarget::Category(Category::Metals))
            .await
            .unwrap();
        assert_eq!(markup, "<table>gold</table>");
    }

    #[tokio::test]
    async fn test_remote_bunker_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrape/bunker"))
            .and(query_param("type", "vlsfo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": "<td>587.50</td>" })),
            )
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let markup = remote
            .markup(&ScrapeTarget::Bunker(crate::domain::BunkerType::Vlsfo))
            .await
            .unwrap();
        assert!(markup.contains("587.50"));
    }

    #[tokio::test]
    async fn test_remote_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrape/bunker/emea"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let result = remote.markup(&ScrapeTarget::BunkerEmea).await;
        assert!(matches!(result, Err(FetchError::RemoteStatus { status: 502, .. })));
    }

    #[tokio::test]
    async fn test_remote_envelope_without_data_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrape/symbol/FBX"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "error": "scrape_failed", "message": "upstream empty" }),
            ))
            .mount(&server)
            .await;

        let remote = remote_for(&server);
        let result = remote.markup(&ScrapeTarget::Symbol("FBX".to_string())).await;
        match result {
            Err(FetchError::MalformedResponse { reason, .. }) => {
                assert!(reason.contains("upstream empty"));
            }
            other => panic!("expected MalformedResponse, got {:?}", other.map(|m| m.len())),
        }
    }

    /// Scripted tier for fallback-order tests
    struct ScriptedTier {
        result: Result<String, fn() -> FetchError>,
        calls: AtomicUsize,
    }

    impl ScriptedTier {
        fn ok(markup: &str) -> Self {
            Self {
                result: Ok(markup.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(make: fn() -> FetchError) -> Self {
            Self {
                result: Err(make),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MarkupSource for ScriptedTier {
        async fn markup(&self, _target: &ScrapeTarget) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(markup) => Ok(markup.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn challenge_error() -> FetchError {
        FetchError::ChallengeUnresolved {
            url: "https://example.com".to_string(),
        }
    }

    fn remote_error() -> FetchError {
        FetchError::RemoteStatus {
            status: 500,
            url: "https://remote.example".to_string(),
        }
    }

    #[tokio::test]
    async fn test_local_success_skips_remote() {
        let local = Arc::new(ScriptedTier::ok("<p>local</p>"));
        let remote = Arc::new(ScriptedTier::ok("<p>remote</p>"));
        let resilient = ResilientMarkupSource::new(local.clone(), remote.clone(), TierConfig::default());

        let markup = resilient.markup(&ScrapeTarget::BunkerEmea).await.unwrap();
        assert_eq!(markup, "<p>local</p>");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_failure_falls_back_to_remote() {
        let local = Arc::new(ScriptedTier::failing(challenge_error));
        let remote = Arc::new(ScriptedTier::ok("<p>remote</p>"));
        let resilient = ResilientMarkupSource::new(local, remote.clone(), TierConfig::default());

        let markup = resilient.markup(&ScrapeTarget::BunkerEmea).await.unwrap();
        assert_eq!(markup, "<p>remote</p>");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_local_attempt_finishes_detached() {
        use std::sync::atomic::AtomicBool;
        use std::time::Duration;

        /// Tier slower than the local timeout; flags when its work
        /// (including cleanup) actually completed.
        struct SlowTier {
            finished: Arc<AtomicBool>,
        }

        #[async_trait]
        impl MarkupSource for SlowTier {
            async fn markup(&self, _target: &ScrapeTarget) -> Result<String, FetchError> {
                tokio::time::sleep(Duration::from_secs(120)).await;
                self.finished.store(true, Ordering::SeqCst);
                Ok("<p>late</p>".to_string())
            }
        }

        let finished = Arc::new(AtomicBool::new(false));
        let local = Arc::new(SlowTier { finished: finished.clone() });
        let remote = Arc::new(ScriptedTier::ok("<p>remote</p>"));
        let tiers = TierConfig {
            local_request_timeout_secs: 1,
            ..TierConfig::default()
        };
        let resilient = ResilientMarkupSource::new(local, remote, tiers);

        let markup = resilient.markup(&ScrapeTarget::BunkerEmea).await.unwrap();
        assert_eq!(markup, "<p>remote</p>");
        assert!(!finished.load(Ordering::SeqCst));

        // The abandoned attempt keeps running detached and still completes
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_both_tiers_failing_reports_both_causes() {
        let local = Arc::new(ScriptedTier::failing(challenge_error));
        let remote = Arc::new(ScriptedTier::failing(remote_error));
        let resilient = ResilientMarkupSource::new(local, remote, TierConfig::default());

        let error = resilient.markup(&ScrapeTarget::BunkerEmea).await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("challenge"));
        assert!(message.contains("500"));
    }
}
