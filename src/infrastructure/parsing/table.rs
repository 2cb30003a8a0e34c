//! Tabular extraction regime for category table pages
//!
//! Category pages (metals, agricultural, energy) render one repeating row
//! per commodity with fixed-position cells: symbol/name, price, percent
//! change, absolute change, day high, day low, technical rating. Rows that
//! cannot establish a positive price are skipped, never emitted as
//! placeholders.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::domain::{Category, Commodity, CommodityKind, TechnicalEvaluation};

use super::numeric::{parse_positive_price, parse_range_bound, parse_signed_change};
use super::ExtractionConfig;

// Fixed cell positions in a category table row
const CELL_NAME: usize = 0;
const CELL_PRICE: usize = 1;
const CELL_PERCENT_CHANGE: usize = 2;
const CELL_ABSOLUTE_CHANGE: usize = 3;
const CELL_HIGH: usize = 4;
const CELL_LOW: usize = 5;
const CELL_RATING: usize = 6;

/// Extract all valid commodity rows from a category table page.
///
/// Walks the ordered row-selector candidates and commits to the first one
/// that yields at least one valid record, so a site-specific selector
/// breaking degrades to the generic fallbacks instead of failing the page.
pub fn extract_category_table(
    markup: &str,
    category: Category,
    config: &ExtractionConfig,
) -> Vec<Commodity> {
    let html = Html::parse_document(markup);

    for selector_str in &config.table_row_selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            warn!("Skipping invalid table row selector: {}", selector_str);
            continue;
        };

        let rows: Vec<ElementRef> = html.select(&selector).collect();
        if rows.is_empty() {
            continue;
        }

        let commodities: Vec<Commodity> = rows
            .iter()
            .filter_map(|row| extract_row(row, category))
            .collect();

        if !commodities.is_empty() {
            debug!(
                "Extracted {} commodities from {} rows using selector '{}'",
                commodities.len(),
                rows.len(),
                selector_str
            );
            return commodities;
        }
    }

    debug!("No commodity rows matched any selector for category {}", category);
    Vec::new()
}

/// Extract one row; `None` when the row is malformed or has no positive price.
fn extract_row(row: &ElementRef, category: Category) -> Option<Commodity> {
    let cell_selector = Selector::parse("td").expect("static selector");
    let cells: Vec<ElementRef> = row.select(&cell_selector).collect();

    // Header rows and spacer rows have no data cells
    if cells.len() <= CELL_PRICE {
        return None;
    }

    let name = cell_text(&cells, CELL_NAME)?;
    let symbol = row
        .value()
        .attr("data-symbol")
        .map(str::to_string)
        .or_else(|| first_emphasized_text(&cells[CELL_NAME]))
        .unwrap_or_else(|| name.clone());

    let price = parse_positive_price(&cell_text(&cells, CELL_PRICE)?)?;

    let percent_change = signed_cell(&cells, CELL_PERCENT_CHANGE);
    let absolute_change = signed_cell(&cells, CELL_ABSOLUTE_CHANGE);
    let high = cell_text(&cells, CELL_HIGH).map(|t| parse_range_bound(&t)).unwrap_or(0.0);
    let low = cell_text(&cells, CELL_LOW).map(|t| parse_range_bound(&t)).unwrap_or(0.0);
    let technical_evaluation = cell_text(&cells, CELL_RATING)
        .map(|t| TechnicalEvaluation::from_label(&t))
        .unwrap_or_default();

    Some(Commodity {
        symbol,
        kind: CommodityKind::from_label(&name),
        name,
        price,
        percent_change,
        absolute_change,
        high,
        low,
        technical_evaluation,
        category,
    })
}

/// Signed change cell: glyph first, then the CSS-class negative indicator
/// when the glyph is absent.
fn signed_cell(cells: &[ElementRef], index: usize) -> f64 {
    let Some(cell) = cells.get(index) else {
        return 0.0;
    };
    let text = collect_text(cell);
    parse_signed_change(&text, has_negative_class_hint(cell))
}

/// Style/class negative indicator, e.g. `<td class="change negative">2.5%</td>`.
/// Best-effort secondary signal only; an explicit glyph always wins.
fn has_negative_class_hint(cell: &ElementRef) -> bool {
    cell.value()
        .attr("class")
        .map(|classes| {
            classes
                .split_whitespace()
                .any(|c| matches!(c, "negative" | "red" | "down" | "minus" | "text-danger"))
        })
        .unwrap_or(false)
}

fn cell_text(cells: &[ElementRef], index: usize) -> Option<String> {
    let text = collect_text(cells.get(index)?);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn collect_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Symbol markup convention: the ticker sits in a <b> or <a> inside the
/// name cell.
fn first_emphasized_text(cell: &ElementRef) -> Option<String> {
    let selector = Selector::parse("b, a").expect("static selector");
    cell.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}
