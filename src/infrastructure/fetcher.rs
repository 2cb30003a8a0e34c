//! Fetch orchestrator
//!
//! Coordinates one-or-many page loads per logical request over a
//! tier-agnostic markup source: single category-table fetch, per-symbol
//! fetch with exchange-prefix retry, and batched multi-symbol fetch with
//! bounded concurrency and inter-batch pacing. Every record leaving this
//! layer satisfies the positive-price invariant; a batch where every item
//! misses yields an empty list, never a panic or an abort.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::catalog::SYMBOL_PREFIX_VARIANTS;
use crate::domain::{BunkerType, BunkerTypeSpec, Category, Commodity, FreightSymbolSpec};
use crate::infrastructure::config::{FetchConfig, TargetConfig};
use crate::infrastructure::errors::FetchError;
use crate::infrastructure::parsing::single::EntityIdentity;
use crate::infrastructure::parsing::{
    extract_category_table, extract_single_entity, ExtractionConfig, SingleEntityTarget,
};
use crate::infrastructure::readiness::SiteProfile;

/// A logical page the pipeline knows how to acquire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScrapeTarget {
    /// Aggregate table page for a category
    Category(Category),
    /// Quote page for one exchange symbol (possibly prefix-qualified)
    Symbol(String),
    /// Price page for one bunker fuel grade
    Bunker(BunkerType),
    /// EMEA regional bunker overview page
    BunkerEmea,
    /// Arbitrary URL (the /scrape/generic surface)
    Generic(String),
}

impl ScrapeTarget {
    pub fn url(&self, targets: &TargetConfig) -> String {
        match self {
            ScrapeTarget::Category(category) => targets.category_url(*category),
            ScrapeTarget::Symbol(symbol) => targets.symbol_url(symbol),
            ScrapeTarget::Bunker(bunker_type) => targets.bunker_url(*bunker_type),
            ScrapeTarget::BunkerEmea => targets.bunker_emea_url.clone(),
            ScrapeTarget::Generic(url) => url.clone(),
        }
    }

    /// Readiness profile for the target family
    pub fn profile(&self, targets: &TargetConfig) -> SiteProfile {
        match self {
            ScrapeTarget::Category(_) => SiteProfile::category(targets),
            ScrapeTarget::Symbol(_) => SiteProfile::symbol(targets),
            ScrapeTarget::Bunker(_) | ScrapeTarget::BunkerEmea => SiteProfile::bunker(targets),
            ScrapeTarget::Generic(_) => SiteProfile::generic(targets),
        }
    }
}

/// Tier-agnostic `loadAndRead` primitive: resolve a target to its rendered
/// markup. Implemented by the owned browser tier, the remote service
/// client, and the resilient combination of the two.
#[async_trait]
pub trait MarkupSource: Send + Sync {
    async fn markup(&self, target: &ScrapeTarget) -> Result<String, FetchError>;
}

/// Explicit retry policy for single-symbol fetches: the ordered list of
/// exchange-prefix variants tried until one resolves to a positive price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixRetryPolicy {
    pub variants: Vec<String>,
}

impl Default for PrefixRetryPolicy {
    fn default() -> Self {
        Self {
            variants: SYMBOL_PREFIX_VARIANTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PrefixRetryPolicy {
    /// Qualified symbol candidates in retry order
    pub fn candidates(&self, symbol: &str) -> Vec<String> {
        self.variants
            .iter()
            .map(|prefix| format!("{}{}", prefix, symbol))
            .collect()
    }
}

/// Fetch orchestrator over a markup source
pub struct FetchOrchestrator {
    source: Arc<dyn MarkupSource>,
    fetch: FetchConfig,
    extraction: ExtractionConfig,
    retry: PrefixRetryPolicy,
}

impl FetchOrchestrator {
    pub fn new(source: Arc<dyn MarkupSource>, fetch: FetchConfig) -> Self {
        Self {
            source,
            fetch,
            extraction: ExtractionConfig::default(),
            retry: PrefixRetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: PrefixRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_extraction_config(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Category fetch: one page load, tabular extraction.
    pub async fn fetch_category(&self, category: Category) -> Result<Vec<Commodity>, FetchError> {
        let markup = self.source.markup(&ScrapeTarget::Category(category)).await?;
        let records = extract_category_table(&markup, category, &self.extraction);
        info!("Category {} yielded {} records", category, records.len());
        debug_assert!(records.iter().all(Commodity::is_valid));
        Ok(records)
    }

    /// Single-symbol fetch with exchange-prefix retry. A symbol that fails
    /// to resolve a positive price under every variant is a miss, not an
    /// error.
    pub async fn fetch_symbol(&self, spec: &FreightSymbolSpec) -> Option<Commodity> {
        let identity = EntityIdentity {
            symbol: spec.exchange_symbol.to_string(),
            name: spec.display_name.to_string(),
            kind: spec.kind,
            category: Category::Freight,
        };

        for candidate in self.retry.candidates(spec.exchange_symbol) {
            let markup = match self.source.markup(&ScrapeTarget::Symbol(candidate.clone())).await {
                Ok(markup) => markup,
                Err(e) => {
                    warn!("Symbol page {} failed: {}", candidate, e);
                    continue;
                }
            };

            if let Some(record) = extract_single_entity(
                &markup,
                SingleEntityTarget::Symbol,
                &identity,
                &self.extraction,
            ) {
                debug!("Symbol {} resolved as {}", spec.exchange_symbol, candidate);
                return Some(record);
            }
            debug!("No positive price for {} under variant {}", spec.exchange_symbol, candidate);
        }

        warn!("Symbol {} unresolved after all prefix variants", spec.exchange_symbol);
        None
    }

    /// Single bunker-grade fetch; no prefix variants apply.
    pub async fn fetch_bunker(&self, spec: &BunkerTypeSpec) -> Option<Commodity> {
        let identity = EntityIdentity {
            symbol: spec.bunker_type.as_str().to_uppercase(),
            name: spec.display_name.to_string(),
            kind: spec.kind,
            category: Category::Bunker,
        };

        let markup = match self.source.markup(&ScrapeTarget::Bunker(spec.bunker_type)).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!("Bunker page {} failed: {}", spec.bunker_type, e);
                return None;
            }
        };

        extract_single_entity(&markup, SingleEntityTarget::Bunker, &identity, &self.extraction)
    }

    /// Batched freight fetch: fixed-size batches, bounded in-batch
    /// concurrency, pacing delay between batches. Misses are dropped and
    /// never abort the batch.
    pub async fn fetch_freight_batch(&self, specs: &[FreightSymbolSpec]) -> Vec<Commodity> {
        self.run_batches(specs, |spec| self.fetch_symbol(spec)).await
    }

    /// Batched bunker fetch with the same batching discipline.
    pub async fn fetch_bunker_batch(&self, specs: &[BunkerTypeSpec]) -> Vec<Commodity> {
        self.run_batches(specs, |spec| self.fetch_bunker(spec)).await
    }

    async fn run_batches<'a, T, F, Fut>(&'a self, specs: &'a [T], fetch_one: F) -> Vec<Commodity>
    where
        F: Fn(&'a T) -> Fut,
        Fut: std::future::Future<Output = Option<Commodity>> + 'a,
    {
        let semaphore = Arc::new(Semaphore::new(self.fetch.batch_concurrency.max(1)));
        let batch_count = specs.chunks(self.fetch.batch_size.max(1)).count();
        let mut records = Vec::with_capacity(specs.len());

        for (index, batch) in specs.chunks(self.fetch.batch_size.max(1)).enumerate() {
            debug!("Running batch {}/{} ({} items)", index + 1, batch_count, batch.len());

            let futures = batch.iter().map(|spec| {
                let semaphore = Arc::clone(&semaphore);
                let fut = fetch_one(spec);
                async move {
                    let _permit = semaphore.acquire().await.ok()?;
                    fut.await
                }
            });

            let batch_records: Vec<Commodity> = futures::future::join_all(futures)
                .await
                .into_iter()
                .flatten()
                .collect();
            records.extend(batch_records);

            // Pace between batches, not after the last one
            if index + 1 < batch_count {
                sleep(self.fetch.batch_pause()).await;
            }
        }

        info!("Batched fetch resolved {}/{} items", records.len(), specs.len());
        debug_assert!(records.iter().all(Commodity::is_valid));
        records
    }
}
