//! scrape-service binary
//!
//! Runs the GET-only scrape surface over the local browser tier. The
//! browser session is owned by the markup source and closed during
//! graceful shutdown so no Chromium process outlives the service.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use commodity_crawler::infrastructure::config::AppConfig;
use commodity_crawler::infrastructure::fallback::BrowserMarkupSource;
use commodity_crawler::infrastructure::logging::init_logging_with_config;
use commodity_crawler::infrastructure::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default()
        .await
        .context("failed to load configuration")?;
    init_logging_with_config(&config.logging).context("failed to initialize logging")?;

    let source = Arc::new(BrowserMarkupSource::new(
        config.session.clone(),
        config.targets.clone(),
    ));

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    };

    server::serve(&config.server, source.clone(), shutdown).await?;

    source.shutdown().await;
    info!("Scrape service stopped");
    Ok(())
}
