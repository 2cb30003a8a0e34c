//! Acquisition error taxonomy
//!
//! Per-row and per-symbol extraction misses are absorbed locally (the
//! record is simply omitted); only whole-page and whole-request failures
//! are represented here and propagate to the consumer.

use std::time::Duration;

use crate::domain::Category;

/// Errors surfaced by the acquisition pipeline
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The browser binary could not be found or started. Fatal for the
    /// current request, never retried at this layer.
    #[error("browser session launch failed: {0}")]
    LaunchFailure(#[source] anyhow::Error),

    /// Navigation did not complete inside the per-navigation timeout.
    /// Callers degrade to a fixed-wait fallback rather than aborting.
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// A bot-challenge interstitial persisted after the single recovery
    /// attempt. Scoped to the affected page only.
    #[error("bot challenge unresolved for {url}")]
    ChallengeUnresolved { url: String },

    /// The remote scrape service answered with a non-success status.
    #[error("remote scrape service returned {status} for {url}")]
    RemoteStatus { status: u16, url: String },

    /// Transport-level failure talking to the remote scrape service.
    #[error("remote scrape request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered 200 but the body was not the expected
    /// `{ "data": "<html>" }` envelope.
    #[error("remote scrape response malformed for {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// Both acquisition tiers failed. Reports both underlying causes,
    /// never just the last one.
    #[error("all acquisition tiers failed; local: {local}; remote: {remote}")]
    AllTiersFailed { local: String, remote: String },

    /// Every item of a whole-category request failed to yield a valid
    /// record. Never cached, so a transient outage cannot masquerade as
    /// an empty dataset.
    #[error("no valid price records extracted for category {category}")]
    NoData { category: Category },
}

impl FetchError {
    /// Fold a local-tier and a remote-tier failure into one error that
    /// reports both causes.
    pub fn all_tiers(local: &FetchError, remote: &FetchError) -> Self {
        FetchError::AllTiersFailed {
            local: local.to_string(),
            remote: remote.to_string(),
        }
    }
}
