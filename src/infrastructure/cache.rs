//! In-memory price cache with per-category TTL
//!
//! One entry per category, replaced wholesale on every successful fetch.
//! Commodity prices move on exchange timescales but consumers poll far
//! more often, so a long TTL (24h by default) absorbs nearly all repeat
//! traffic. Expired entries are evicted lazily on read.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::{Category, Commodity};

struct CacheEntry {
    records: Vec<Commodity>,
    stored_at: Instant,
    last_updated: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// Introspection snapshot for one cached category
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCacheInfo {
    pub last_updated: DateTime<Utc>,
    pub item_count: usize,
    pub is_expired: bool,
}

/// Introspection snapshot of the whole cache
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub ttl_secs: u64,
    pub categories: HashMap<String, CategoryCacheInfo>,
}

/// Category-keyed price cache
pub struct PriceCache {
    entries: RwLock<HashMap<Category, CacheEntry>>,
    ttl: Duration,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Fresh records for a category, or `None` when absent or expired.
    /// Expired entries are evicted on the spot.
    pub async fn get(&self, category: Category) -> Option<Vec<Commodity>> {
        {
            let entries = self.entries.read().await;
            match entries.get(&category) {
                Some(entry) if !entry.is_expired(self.ttl) => {
                    debug!("Cache hit for {} ({} records)", category, entry.records.len());
                    return Some(entry.records.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(&category).is_some_and(|entry| entry.is_expired(self.ttl)) {
            entries.remove(&category);
            debug!("Evicted expired cache entry for {}", category);
        }
        None
    }

    /// Replace the category entry wholesale. Callers never cache an empty
    /// result; an empty fetch is an error, not a dataset.
    pub async fn put(&self, category: Category, records: Vec<Commodity>) {
        let mut entries = self.entries.write().await;
        info!("Caching {} records for {}", records.len(), category);
        entries.insert(
            category,
            CacheEntry {
                records,
                stored_at: Instant::now(),
                last_updated: Utc::now(),
            },
        );
    }

    /// Drop one category's entry.
    pub async fn clear(&self, category: Category) {
        let mut entries = self.entries.write().await;
        if entries.remove(&category).is_some() {
            info!("Cleared cache for {}", category);
        }
    }

    /// Drop every entry.
    pub async fn clear_all(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        info!("Cleared cache ({} categories)", count);
    }

    /// Snapshot of cache state for the introspection surface.
    pub async fn info(&self) -> CacheInfo {
        let entries = self.entries.read().await;
        let categories = entries
            .iter()
            .map(|(category, entry)| {
                (
                    category.as_str().to_string(),
                    CategoryCacheInfo {
                        last_updated: entry.last_updated,
                        item_count: entry.records.len(),
                        is_expired: entry.is_expired(self.ttl),
                    },
                )
            })
            .collect();

        CacheInfo {
            ttl_secs: self.ttl.as_secs(),
            categories,
        }
    }
}
