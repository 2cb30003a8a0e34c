//! Infrastructure layer for browser control, parsing, and external integrations
//!
//! This module provides headless-browser session management, content
//! readiness detection, markup extraction, the tiered acquisition client,
//! the time-boxed price cache, and the scrape-service HTTP surface.

pub mod cache;
pub mod config; // Configuration constants and helpers
pub mod errors; // Typed acquisition error taxonomy
pub mod fallback; // Local-then-remote markup tiers
pub mod fetcher; // Fetch orchestrator
pub mod logging; // Logging infrastructure
pub mod parsing; // Extraction engine
pub mod readiness; // Content-readiness state machine
pub mod server; // Scrape-service HTTP endpoints
pub mod session; // Browser session controller

// Re-export commonly used items
pub use cache::{CacheInfo, CategoryCacheInfo, PriceCache};
pub use config::AppConfig;
pub use errors::FetchError;
pub use fallback::{BrowserMarkupSource, RemoteMarkupSource, ResilientMarkupSource};
pub use fetcher::{FetchOrchestrator, MarkupSource, PrefixRetryPolicy, ScrapeTarget};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use readiness::{PageAssessment, PageState, ReadinessDetector, SiteProfile};
pub use session::BrowserSession;
