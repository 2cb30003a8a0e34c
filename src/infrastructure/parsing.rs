//! Extraction engine - pure transformations from rendered markup to records
//!
//! Two extraction regimes share the numeric normalization in `numeric`:
//! - `table`: repeating-row category pages (metals, agricultural, energy)
//! - `single`: one-price-per-page targets (freight symbols, bunker grades)
//!
//! Both regimes walk an ordered list of selector candidates, most specific
//! first, and the single-entity regime falls back to regular expressions
//! over the raw markup as a last resort. Nothing here touches the network;
//! every function takes markup in and returns records (or misses) out.

pub mod numeric;
pub mod single;
pub mod table;

use serde::{Deserialize, Serialize};

pub use numeric::{is_non_price_artifact, parse_positive_price, parse_range_bound, parse_signed_change};
pub use single::{extract_single_entity, SingleEntityTarget};
pub use table::extract_category_table;

/// CSS selector candidates and regex fallback patterns for both regimes.
/// Defaults match the current markup of the target sites; a config file can
/// override them when a site reshuffles its DOM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Row selector candidates for category tables, most specific first
    pub table_row_selectors: Vec<String>,
    /// Price element candidates for single-symbol pages
    pub symbol_price_selectors: Vec<String>,
    /// Percent-change element candidates for single-symbol pages
    pub symbol_change_selectors: Vec<String>,
    /// Price element candidates for bunker grade pages
    pub bunker_price_selectors: Vec<String>,
    /// Regex fallback patterns applied to raw markup when no selector hits.
    /// First capture group must be the numeric token.
    pub price_regex_patterns: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            table_row_selectors: vec![
                "table.commodities-table tbody tr".to_string(),
                "tr[data-symbol]".to_string(),
                "table tbody tr".to_string(),
                "table tr".to_string(),
                "tr".to_string(),
            ],
            symbol_price_selectors: vec![
                "[data-field=\"last_price\"]".to_string(),
                ".tv-symbol-price-quote__value".to_string(),
                ".js-symbol-last".to_string(),
                ".price-value".to_string(),
                "span.last-price".to_string(),
            ],
            symbol_change_selectors: vec![
                "[data-field=\"change_percent\"]".to_string(),
                ".tv-symbol-price-quote__change".to_string(),
                ".js-symbol-change-pt".to_string(),
                ".change-percent".to_string(),
            ],
            bunker_price_selectors: vec![
                "tr#GLOB td.price".to_string(),
                "td[data-price]".to_string(),
                ".price-latest".to_string(),
                "td.price".to_string(),
            ],
            price_regex_patterns: vec![
                // number immediately followed by a currency/unit marker
                r"(?i)([0-9][0-9.,]{0,14})\s*(?:usd|\$|/\s*mt|per\s+mt)".to_string(),
                // JSON-ish embedded quote data
                r#"(?i)"(?:last|price|close)"\s*:\s*"?([0-9][0-9.,]{0,14})"#.to_string(),
                // currency marker ahead of the number
                r"[$]\s*([0-9][0-9.,]{0,14})".to_string(),
            ],
        }
    }
}
