//! Single-entity extraction regime for symbol and bunker pages
//!
//! Freight index and bunker grade pages carry one headline price each.
//! Extraction walks the ordered selector candidates for the price element
//! first; when none match, ordered regular expressions over the raw markup
//! are the final fallback. The regex path is loosely scoped, so candidates
//! hitting the non-price deny-list (years, fuel grade numbers) are
//! rejected there.

use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::domain::{Category, Commodity, CommodityKind, TechnicalEvaluation};

use super::numeric::{
    is_non_price_artifact, parse_positive_price, parse_range_bound, parse_signed_change,
};
use super::ExtractionConfig;

/// What kind of single-price page is being read; selects the selector set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleEntityTarget {
    /// Exchange symbol quote page (freight indices)
    Symbol,
    /// Bunker grade price page
    Bunker,
}

/// Identity of the record being extracted; the page itself only yields
/// numbers.
#[derive(Debug, Clone)]
pub struct EntityIdentity {
    pub symbol: String,
    pub name: String,
    pub kind: CommodityKind,
    pub category: Category,
}

/// Extract one commodity record from a single-entity page.
///
/// Returns `None` when no positive price can be established after every
/// selector candidate and every regex pattern - a miss, not an error.
pub fn extract_single_entity(
    markup: &str,
    target: SingleEntityTarget,
    identity: &EntityIdentity,
    config: &ExtractionConfig,
) -> Option<Commodity> {
    let html = Html::parse_document(markup);

    let selectors = match target {
        SingleEntityTarget::Symbol => &config.symbol_price_selectors,
        SingleEntityTarget::Bunker => &config.bunker_price_selectors,
    };

    let price = price_from_selectors(&html, selectors)
        .or_else(|| price_from_regex(markup, &config.price_regex_patterns))?;

    let (percent_change, absolute_change) = change_from_selectors(&html, &config.symbol_change_selectors);
    let (high, low) = range_from_markup(&html);

    Some(Commodity {
        symbol: identity.symbol.clone(),
        name: identity.name.clone(),
        price,
        percent_change,
        absolute_change,
        high,
        low,
        technical_evaluation: evaluation_from_change(percent_change),
        kind: identity.kind,
        category: identity.category,
    })
}

/// First selector candidate whose first match parses to a positive price.
fn price_from_selectors(html: &Html, candidates: &[String]) -> Option<f64> {
    for selector_str in candidates {
        let Ok(selector) = Selector::parse(selector_str) else {
            warn!("Skipping invalid price selector: {}", selector_str);
            continue;
        };

        for element in html.select(&selector) {
            let text = element_text(&element);
            if let Some(price) = parse_positive_price(&text) {
                debug!("Price {} found via selector '{}'", price, selector_str);
                return Some(price);
            }
        }
    }
    None
}

/// Regex fallback over raw markup, first non-artifact positive value wins.
fn price_from_regex(markup: &str, patterns: &[String]) -> Option<f64> {
    for pattern in patterns {
        let Some(regex) = compiled(pattern) else {
            continue;
        };

        for capture in regex.captures_iter(markup) {
            let Some(token) = capture.get(1) else {
                continue;
            };
            if let Some(price) = parse_positive_price(token.as_str()) {
                if is_non_price_artifact(price) {
                    debug!("Rejecting non-price artifact {} from regex fallback", price);
                    continue;
                }
                debug!("Price {} found via regex fallback '{}'", price, pattern);
                return Some(price);
            }
        }
    }
    None
}

/// Percent and absolute change are optional on single-entity pages;
/// freight index pages often render the percent move only.
fn change_from_selectors(html: &Html, candidates: &[String]) -> (f64, f64) {
    for selector_str in candidates {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = html.select(&selector).next() {
            let text = element_text(&element);
            let negative_hint = has_negative_class_hint(&element);
            let percent = parse_signed_change(&text, negative_hint);
            return (percent, 0.0);
        }
    }
    (0.0, 0.0)
}

/// Day range where the page exposes one; 0/0 means range not applicable.
fn range_from_markup(html: &Html) -> (f64, f64) {
    let high = value_for(html, "[data-field=\"high\"], .js-symbol-high, .day-high");
    let low = value_for(html, "[data-field=\"low\"], .js-symbol-low, .day-low");
    (high, low)
}

fn value_for(html: &Html, selector_str: &str) -> f64 {
    let Ok(selector) = Selector::parse(selector_str) else {
        return 0.0;
    };
    html.select(&selector)
        .next()
        .map(|el| parse_range_bound(&element_text(&el)))
        .unwrap_or(0.0)
}

fn evaluation_from_change(percent_change: f64) -> TechnicalEvaluation {
    if percent_change > 0.0 {
        TechnicalEvaluation::Positive
    } else if percent_change < 0.0 {
        TechnicalEvaluation::Negative
    } else {
        TechnicalEvaluation::Neutral
    }
}

fn has_negative_class_hint(element: &ElementRef) -> bool {
    element
        .value()
        .attr("class")
        .map(|classes| {
            classes
                .split_whitespace()
                .any(|c| matches!(c, "negative" | "red" | "down" | "minus" | "text-danger"))
        })
        .unwrap_or(false)
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Compile-once regex cache keyed by pattern text. Patterns come from
/// config and are few, so a small linear scan is fine.
fn compiled(pattern: &str) -> Option<&'static Regex> {
    use std::sync::Mutex;

    static CACHE: OnceCell<Mutex<Vec<(String, &'static Regex)>>> = OnceCell::new();
    let cache = CACHE.get_or_init(|| Mutex::new(Vec::new()));
    let mut guard = cache.lock().unwrap();

    if let Some((_, regex)) = guard.iter().find(|(p, _)| p == pattern) {
        return Some(regex);
    }

    match Regex::new(pattern) {
        Ok(regex) => {
            let leaked: &'static Regex = Box::leak(Box::new(regex));
            guard.push((pattern.to_string(), leaked));
            Some(leaked)
        }
        Err(e) => {
            warn!("Invalid price regex pattern '{}': {}", pattern, e);
            None
        }
    }
}
