//! Per-page content-readiness detection and bot-challenge recovery
//!
//! Target sites are third-party and uncontrolled; a hard dependency on a
//! readiness selector would make the pipeline brittle to minor markup
//! changes. The detector therefore always eventually reads content: a
//! readiness timeout degrades to a fixed grace wait instead of failing,
//! and a detected bot-challenge gets exactly one cooldown-and-reload
//! recovery cycle before being surfaced as a page-scoped failure.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::infrastructure::config::TargetConfig;
use crate::infrastructure::errors::FetchError;

/// Phrases that identify an anti-automation interstitial instead of content
const CHALLENGE_MARKERS: &[&str] = &[
    "Just a moment",
    "Checking your browser",
    "Verifying you are human",
    "cf-browser-verification",
    "cf-challenge",
    "Attention Required!",
    "DDoS protection by",
];

/// Readiness state machine per page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Loading,
    ChallengePresent,
    Recovering,
    ContentReady,
    TimedOutFallback,
}

/// Pure assessment of fetched markup against a site profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAssessment {
    ChallengeDetected,
    Ready,
    NotReady,
}

/// Site-specific readiness parameters for one target family
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Selectors whose presence signals meaningful content, any-of
    pub readiness_selectors: Vec<String>,
    /// Bound on the readiness-selector wait (6-10s depending on target)
    pub readiness_timeout: Duration,
    /// Grace wait applied after a readiness timeout before reading anyway
    pub fallback_grace: Duration,
    /// Cooldown before the single challenge-recovery reload
    pub challenge_cooldown: Duration,
    /// Selector poll cadence
    pub poll_interval: Duration,
}

impl SiteProfile {
    /// Profile for category table pages
    pub fn category(targets: &TargetConfig) -> Self {
        Self {
            readiness_selectors: vec![
                "table.commodities-table tbody tr".to_string(),
                "tr[data-symbol]".to_string(),
                "table tbody tr".to_string(),
            ],
            readiness_timeout: Duration::from_secs(targets.category_readiness_timeout_secs),
            ..Self::base(targets)
        }
    }

    /// Profile for single-symbol quote pages
    pub fn symbol(targets: &TargetConfig) -> Self {
        Self {
            readiness_selectors: vec![
                "[data-field=\"last_price\"]".to_string(),
                ".tv-symbol-price-quote__value".to_string(),
                ".js-symbol-last".to_string(),
            ],
            readiness_timeout: Duration::from_secs(targets.symbol_readiness_timeout_secs),
            ..Self::base(targets)
        }
    }

    /// Profile for bunker price pages
    pub fn bunker(targets: &TargetConfig) -> Self {
        Self {
            readiness_selectors: vec![
                "td.price".to_string(),
                "td[data-price]".to_string(),
                "table tbody tr".to_string(),
            ],
            readiness_timeout: Duration::from_secs(targets.bunker_readiness_timeout_secs),
            ..Self::base(targets)
        }
    }

    /// Profile for arbitrary pages fetched through /scrape/generic: no
    /// site-specific selector, so the readiness wait is skipped entirely
    /// and only challenge recovery applies.
    pub fn generic(targets: &TargetConfig) -> Self {
        Self {
            readiness_selectors: Vec::new(),
            readiness_timeout: Duration::from_secs(0),
            ..Self::base(targets)
        }
    }

    fn base(targets: &TargetConfig) -> Self {
        Self {
            readiness_selectors: Vec::new(),
            readiness_timeout: Duration::from_secs(0),
            fallback_grace: Duration::from_millis(targets.fallback_grace_ms),
            challenge_cooldown: Duration::from_millis(targets.challenge_cooldown_ms),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Minimal page surface the detector needs; implemented by the live
/// browser page and by test fakes.
#[async_trait]
pub trait PageProbe: Send + Sync {
    /// Current document markup
    async fn markup(&self) -> Result<String, FetchError>;
    /// Force a full reload
    async fn reload(&self) -> Result<(), FetchError>;
    /// Whether any element matches the CSS selector right now
    async fn selector_exists(&self, selector: &str) -> Result<bool, FetchError>;
    /// Page URL, for log and error context
    fn url(&self) -> String;
}

/// Markup handed back by the detector plus the terminal state it reached
#[derive(Debug)]
pub struct ReadyMarkup {
    pub markup: String,
    pub state: PageState,
}

/// Readiness detector - drives the state machine over a [`PageProbe`]
pub struct ReadinessDetector {
    profile: SiteProfile,
}

impl ReadinessDetector {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    /// Pure assessment of markup: a challenge marker beats everything,
    /// then the profile's readiness selectors are matched against the
    /// parsed document, any-of. An empty selector list is always ready.
    pub fn assess_markup(markup: &str, profile: &SiteProfile) -> PageAssessment {
        if contains_challenge_marker(markup) {
            return PageAssessment::ChallengeDetected;
        }
        if profile.readiness_selectors.is_empty() {
            return PageAssessment::Ready;
        }

        let html = Html::parse_document(markup);
        for selector_str in &profile.readiness_selectors {
            let Ok(selector) = Selector::parse(selector_str) else {
                warn!("Skipping invalid readiness selector: {}", selector_str);
                continue;
            };
            if html.select(&selector).next().is_some() {
                return PageAssessment::Ready;
            }
        }
        PageAssessment::NotReady
    }

    /// Wait until the page holds meaningful content, recovering from a
    /// bot-challenge at most once, then return whatever markup is there.
    pub async fn wait_for_content(&self, probe: &dyn PageProbe) -> Result<ReadyMarkup, FetchError> {
        let url = probe.url();
        let mut state = PageState::Loading;
        debug!("Readiness check starting for {} ({:?})", url, state);

        let markup = probe.markup().await?;
        if Self::assess_markup(&markup, &self.profile) == PageAssessment::ChallengeDetected {
            state = PageState::ChallengePresent;
            info!("Bot challenge detected on {} ({:?}), recovering once", url, state);

            state = PageState::Recovering;
            sleep(self.profile.challenge_cooldown).await;
            probe.reload().await?;

            let after_reload = probe.markup().await?;
            if Self::assess_markup(&after_reload, &self.profile) == PageAssessment::ChallengeDetected {
                warn!("Bot challenge persisted on {} after recovery reload", url);
                return Err(FetchError::ChallengeUnresolved { url });
            }
            debug!("Challenge cleared on {} (state was {:?})", url, state);
        }

        // Selector wait, bounded; absence is a degradation, not a failure
        let deadline = Instant::now() + self.profile.readiness_timeout;
        loop {
            if self.any_selector_present(probe).await? {
                state = PageState::ContentReady;
                break;
            }
            if Instant::now() >= deadline {
                state = PageState::TimedOutFallback;
                if !self.profile.readiness_selectors.is_empty() {
                    warn!(
                        "Readiness selectors absent on {} after {:?}, reading anyway after grace wait",
                        url, self.profile.readiness_timeout
                    );
                }
                sleep(self.profile.fallback_grace).await;
                break;
            }
            sleep(self.profile.poll_interval).await;
        }

        let markup = probe.markup().await?;
        debug!("Read {} chars from {} ({:?})", markup.len(), url, state);
        Ok(ReadyMarkup { markup, state })
    }

    async fn any_selector_present(&self, probe: &dyn PageProbe) -> Result<bool, FetchError> {
        for selector in &self.profile.readiness_selectors {
            if probe.selector_exists(selector).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn contains_challenge_marker(markup: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|marker| markup.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fake page that serves a scripted sequence of documents and counts
    /// reloads.
    struct FakePage {
        documents: Mutex<Vec<String>>,
        reloads: AtomicUsize,
        selector_hit: bool,
    }

    impl FakePage {
        fn new(documents: Vec<&str>, selector_hit: bool) -> Self {
            Self {
                documents: Mutex::new(documents.iter().rev().map(|s| s.to_string()).collect()),
                reloads: AtomicUsize::new(0),
                selector_hit,
            }
        }

        fn current(&self) -> String {
            let docs = self.documents.lock().unwrap();
            docs.last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl PageProbe for FakePage {
        async fn markup(&self) -> Result<String, FetchError> {
            Ok(self.current())
        }

        async fn reload(&self) -> Result<(), FetchError> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            let mut docs = self.documents.lock().unwrap();
            if docs.len() > 1 {
                docs.pop();
            }
            Ok(())
        }

        async fn selector_exists(&self, _selector: &str) -> Result<bool, FetchError> {
            Ok(self.selector_hit)
        }

        fn url(&self) -> String {
            "https://example.com/quote".to_string()
        }
    }

    fn fast_profile(selectors: Vec<String>) -> SiteProfile {
        SiteProfile {
            readiness_selectors: selectors,
            readiness_timeout: Duration::from_millis(50),
            fallback_grace: Duration::from_millis(10),
            challenge_cooldown: Duration::from_millis(10),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_content_ready_without_challenge() {
        let page = FakePage::new(vec!["<table><tr><td>2,411</td></tr></table>"], true);
        let detector = ReadinessDetector::new(fast_profile(vec!["table".to_string()]));

        let ready = detector.wait_for_content(&page).await.unwrap();
        assert_eq!(ready.state, PageState::ContentReady);
        assert_eq!(page.reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_challenge_triggers_exactly_one_reload() {
        let page = FakePage::new(
            vec![
                "<html>Just a moment...</html>",
                "<table><tr><td>587.50</td></tr></table>",
            ],
            true,
        );
        let detector = ReadinessDetector::new(fast_profile(vec!["table".to_string()]));

        let ready = detector.wait_for_content(&page).await.unwrap();
        assert_eq!(ready.state, PageState::ContentReady);
        assert!(ready.markup.contains("587.50"));
        assert_eq!(page.reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_persistent_challenge_is_unresolved_after_one_cycle() {
        // Challenge on the initial load and after the reload: exactly one
        // recovery cycle, then a page-scoped failure - never a loop.
        let page = FakePage::new(
            vec!["<html>Just a moment...</html>", "<html>Checking your browser</html>"],
            true,
        );
        let detector = ReadinessDetector::new(fast_profile(vec!["table".to_string()]));

        let result = detector.wait_for_content(&page).await;
        assert!(matches!(result, Err(FetchError::ChallengeUnresolved { .. })));
        assert_eq!(page.reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_selector_timeout_degrades_to_fallback_read() {
        let page = FakePage::new(vec!["<div class=\"odd-markup\">845.5 USD</div>"], false);
        let detector = ReadinessDetector::new(fast_profile(vec!["table".to_string()]));

        let ready = detector.wait_for_content(&page).await.unwrap();
        assert_eq!(ready.state, PageState::TimedOutFallback);
        assert!(ready.markup.contains("845.5"));
    }

    #[test]
    fn test_assess_markup_pure() {
        let profile = fast_profile(vec!["table".to_string()]);
        assert_eq!(
            ReadinessDetector::assess_markup("<html>Verifying you are human</html>", &profile),
            PageAssessment::ChallengeDetected
        );
        // Markup matching a readiness selector is ready; unrelated markup is not
        assert_eq!(
            ReadinessDetector::assess_markup("<table><tr><td>2,411</td></tr></table>", &profile),
            PageAssessment::Ready
        );
        assert_eq!(
            ReadinessDetector::assess_markup("<div>loading...</div>", &profile),
            PageAssessment::NotReady
        );
        let no_selectors = fast_profile(Vec::new());
        assert_eq!(
            ReadinessDetector::assess_markup("<p>anything</p>", &no_selectors),
            PageAssessment::Ready
        );
    }

    #[test]
    fn test_assess_markup_walks_selector_candidates() {
        // Only the second candidate matches; a challenge marker inside the
        // document text still wins over any selector hit.
        let profile = fast_profile(vec!["td.price".to_string(), "tr[data-symbol]".to_string()]);
        assert_eq!(
            ReadinessDetector::assess_markup(
                r#"<table><tr data-symbol="GC1!"><td>2,411</td></tr></table>"#,
                &profile
            ),
            PageAssessment::Ready
        );
        assert_eq!(
            ReadinessDetector::assess_markup(
                r#"<table><tr data-symbol="GC1!"><td>Just a moment...</td></tr></table>"#,
                &profile
            ),
            PageAssessment::ChallengeDetected
        );
    }
}
