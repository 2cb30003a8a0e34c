//! End-to-end pipeline tests over the public API: tiered acquisition
//! feeding the orchestrator, extraction down to validated records.

use std::sync::Arc;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use commodity_crawler::domain::{Category, Commodity, CommodityKind, FreightSymbolSpec};
use commodity_crawler::infrastructure::config::{FetchConfig, TierConfig};
use commodity_crawler::infrastructure::fallback::{RemoteMarkupSource, ResilientMarkupSource};
use commodity_crawler::infrastructure::{
    FetchError, FetchOrchestrator, MarkupSource, PrefixRetryPolicy, ScrapeTarget,
};

const METALS_TABLE: &str = r#"
<table class="commodities-table"><tbody>
  <tr data-symbol="GC1!">
    <td><b>GC1!</b> Gold Futures</td><td>2,411.50</td><td>+0.40%</td><td>+9.60</td>
    <td>2,420.00</td><td>2,395.10</td><td>Buy</td>
  </tr>
  <tr data-symbol="SI1!">
    <td><b>SI1!</b> Silver Futures</td><td>29.1672</td>
    <td class="negative">1.25%</td><td class="negative">0.37</td>
    <td>29.60</td><td>28.90</td><td>Sell</td>
  </tr>
  <tr data-symbol="XX1!">
    <td><b>XX1!</b> Broken Row</td><td>n/a</td><td></td><td></td>
    <td></td><td></td><td></td>
  </tr>
</tbody></table>
"#;

/// Local tier that always fails, forcing the remote path.
struct DeadLocalTier;

#[async_trait]
impl MarkupSource for DeadLocalTier {
    async fn markup(&self, _target: &ScrapeTarget) -> Result<String, FetchError> {
        Err(FetchError::ChallengeUnresolved {
            url: "https://local.example".to_string(),
        })
    }
}

fn fast_fetch() -> FetchConfig {
    FetchConfig {
        batch_size: 3,
        batch_concurrency: 3,
        batch_pause_ms: 1,
    }
}

#[tokio::test]
async fn remote_fallback_feeds_category_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scrape/category/metals"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": METALS_TABLE })),
        )
        .mount(&server)
        .await;

    let tiers = TierConfig {
        remote_base_url: server.uri(),
        remote_max_requests_per_second: 100,
        ..TierConfig::default()
    };
    let remote = Arc::new(RemoteMarkupSource::new(&tiers).unwrap());
    let resilient: Arc<dyn MarkupSource> =
        Arc::new(ResilientMarkupSource::new(Arc::new(DeadLocalTier), remote, tiers));

    let orchestrator = FetchOrchestrator::new(resilient, fast_fetch());
    let records = orchestrator.fetch_category(Category::Metals).await.unwrap();

    // Two valid rows survive, the priceless row is dropped
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(Commodity::is_valid));

    let silver = records.iter().find(|c| c.symbol == "SI1!").unwrap();
    assert_eq!(silver.price, 29.1672);
    assert_eq!(silver.percent_change, -1.25);
    assert_eq!(silver.kind, CommodityKind::Silver);
}

#[tokio::test]
async fn freight_batch_resolves_symbols_with_prefix_retry() {
    struct FreightPages;

    #[async_trait]
    impl MarkupSource for FreightPages {
        async fn markup(&self, target: &ScrapeTarget) -> Result<String, FetchError> {
            match target {
                // BDI only resolves under the INDEX: prefix
                ScrapeTarget::Symbol(s) if s == "INDEX:BDI" => {
                    Ok(r#"<span data-field="last_price">1,845</span>"#.to_string())
                }
                ScrapeTarget::Symbol(s) if s == "FBX" => {
                    Ok(r#"<span data-field="last_price">2,950.00</span>"#.to_string())
                }
                ScrapeTarget::Symbol(_) => Ok("<html>no quote</html>".to_string()),
                _ => unreachable!("freight batch only requests symbol pages"),
            }
        }
    }

    let specs = [
        FreightSymbolSpec {
            exchange_symbol: "FBX",
            display_name: "Freightos Baltic Index (Global)",
            kind: CommodityKind::Container,
        },
        FreightSymbolSpec {
            exchange_symbol: "BDI",
            display_name: "Baltic Dry Index",
            kind: CommodityKind::DryBulk,
        },
        FreightSymbolSpec {
            exchange_symbol: "GONE",
            display_name: "Delisted Index",
            kind: CommodityKind::Other,
        },
    ];

    let orchestrator = FetchOrchestrator::new(Arc::new(FreightPages), fast_fetch())
        .with_retry_policy(PrefixRetryPolicy {
            variants: vec![String::new(), "INDEX:".to_string()],
        });

    let records = orchestrator.fetch_freight_batch(&specs).await;
    assert_eq!(records.len(), 2);

    let bdi = records.iter().find(|c| c.symbol == "BDI").unwrap();
    assert_eq!(bdi.price, 1845.0);
    assert_eq!(bdi.category, Category::Freight);
}

#[tokio::test]
async fn both_tiers_down_surfaces_combined_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tiers = TierConfig {
        remote_base_url: server.uri(),
        remote_max_requests_per_second: 100,
        ..TierConfig::default()
    };
    let remote = Arc::new(RemoteMarkupSource::new(&tiers).unwrap());
    let resilient: Arc<dyn MarkupSource> =
        Arc::new(ResilientMarkupSource::new(Arc::new(DeadLocalTier), remote, tiers));

    let orchestrator = FetchOrchestrator::new(resilient, fast_fetch());
    let error = orchestrator.fetch_category(Category::Energy).await.unwrap_err();

    let message = error.to_string();
    assert!(message.contains("challenge"));
    assert!(message.contains("503"));
}
