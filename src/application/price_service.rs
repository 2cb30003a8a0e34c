//! Price acquisition service
//!
//! Library-facing entry point for whole-category price requests. Routes a
//! category to its acquisition strategy (aggregate table vs per-symbol
//! batch), consults the cache first, and owns the browser lifecycle for
//! the duration of one request: the session is launched lazily, shared
//! across the request's fetches, and closed on every exit path.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Category, Commodity, BUNKER_TYPES, FREIGHT_SYMBOLS};
use crate::infrastructure::cache::{CacheInfo, PriceCache};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::errors::FetchError;
use crate::infrastructure::fallback::{
    BrowserMarkupSource, RemoteMarkupSource, ResilientMarkupSource,
};
use crate::infrastructure::fetcher::{FetchOrchestrator, MarkupSource};

/// Cached, tiered price acquisition for whole categories
pub struct PriceService {
    config: AppConfig,
    cache: PriceCache,
}

impl PriceService {
    pub fn new(config: AppConfig) -> Self {
        let cache = PriceCache::new(config.cache.ttl());
        Self { config, cache }
    }

    /// Fetch all records for a category, serving from cache unless the
    /// entry is stale or `force_refresh` is set. An empty result is
    /// `NoData` and is never cached.
    pub async fn fetch_category(
        &self,
        category: Category,
        force_refresh: bool,
    ) -> Result<Vec<Commodity>, FetchError> {
        let local = Arc::new(BrowserMarkupSource::new(
            self.config.session.clone(),
            self.config.targets.clone(),
        ));
        let remote = Arc::new(RemoteMarkupSource::new(&self.config.tiers)?);
        let resilient: Arc<dyn MarkupSource> = Arc::new(ResilientMarkupSource::new(
            local.clone(),
            remote,
            self.config.tiers.clone(),
        ));

        let result = self.fetch_with_source(resilient, category, force_refresh).await;

        // The browser process must not outlive the request
        local.shutdown().await;

        result
    }

    /// Cache introspection snapshot.
    pub async fn cache_info(&self) -> CacheInfo {
        self.cache.info().await
    }

    /// Drop the cached entry for one category.
    pub async fn clear_cache(&self, category: Category) {
        self.cache.clear(category).await;
    }

    /// Drop every cached entry.
    pub async fn clear_all_cache(&self) {
        self.cache.clear_all().await;
    }

    async fn fetch_with_source(
        &self,
        source: Arc<dyn MarkupSource>,
        category: Category,
        force_refresh: bool,
    ) -> Result<Vec<Commodity>, FetchError> {
        if !force_refresh {
            if let Some(records) = self.cache.get(category).await {
                return Ok(records);
            }
        } else {
            info!("Force refresh requested for {}", category);
        }

        let orchestrator = FetchOrchestrator::new(source, self.config.fetch.clone());

        let records = match category {
            Category::Metals | Category::Agricultural | Category::Energy => {
                orchestrator.fetch_category(category).await?
            }
            Category::Freight => orchestrator.fetch_freight_batch(FREIGHT_SYMBOLS).await,
            Category::Bunker => orchestrator.fetch_bunker_batch(BUNKER_TYPES).await,
        };

        if records.is_empty() {
            warn!("Category {} produced no valid records", category);
            return Err(FetchError::NoData { category });
        }

        self.cache.put(category, records.clone()).await;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fetcher::ScrapeTarget;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that always serves the same category table and counts calls.
    struct CountingSource {
        markup: String,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn table() -> Self {
            Self {
                markup: r#"
                    <table><tbody><tr data-symbol="GC1!">
                      <td>Gold</td><td>2,411.50</td><td>+0.4%</td><td>+9.6</td>
                      <td>2,420</td><td>2,395</td><td>Buy</td>
                    </tr></tbody></table>
                "#
                .to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn empty() -> Self {
            Self {
                markup: "<html></html>".to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MarkupSource for CountingSource {
        async fn markup(&self, _target: &ScrapeTarget) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.markup.clone())
        }
    }

    fn service() -> PriceService {
        PriceService::new(AppConfig::default())
    }

    #[tokio::test]
    async fn test_warm_cache_short_circuits_source() {
        let service = service();
        let source = Arc::new(CountingSource::table());

        let records = service
            .fetch_with_source(source.clone(), Category::Metals, false)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Second request is served from cache
        service
            .fetch_with_source(source.clone(), Category::Metals, false)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_warm_cache() {
        let service = service();
        let source = Arc::new(CountingSource::table());

        service
            .fetch_with_source(source.clone(), Category::Metals, false)
            .await
            .unwrap();
        service
            .fetch_with_source(source.clone(), Category::Metals, true)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_no_data_and_uncached() {
        let service = service();
        let source = Arc::new(CountingSource::empty());

        let result = service.fetch_with_source(source, Category::Energy, false).await;
        assert!(matches!(result, Err(FetchError::NoData { category: Category::Energy })));
        assert!(service.cache.get(Category::Energy).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_clear_forces_refetch_path() {
        let service = service();
        let source = Arc::new(CountingSource::table());

        service
            .fetch_with_source(source.clone(), Category::Metals, false)
            .await
            .unwrap();
        service.clear_cache(Category::Metals).await;
        assert!(service.cache.get(Category::Metals).await.is_none());

        let info = service.cache_info().await;
        assert!(info.categories.is_empty());
    }
}
