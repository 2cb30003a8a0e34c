//! Canonical commodity price record and its vocabulary
//!
//! A `Commodity` is created fresh on each successful extraction, never
//! mutated in place, and superseded wholesale by the next successful fetch
//! for its category. A record with a non-positive price is a miss, not a
//! zero value, and must never surface to a consumer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level commodity groupings served by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Metals,
    Agricultural,
    Energy,
    Freight,
    Bunker,
}

impl Category {
    /// All categories, in dashboard display order
    pub const ALL: [Category; 5] = [
        Category::Metals,
        Category::Agricultural,
        Category::Energy,
        Category::Freight,
        Category::Bunker,
    ];

    /// Stable lowercase name used in URLs and cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Metals => "metals",
            Category::Agricultural => "agricultural",
            Category::Energy => "energy",
            Category::Freight => "freight",
            Category::Bunker => "bunker",
        }
    }

    /// Whether this category is served by a single aggregate table page.
    /// Freight and bunker have no aggregate table and require one page
    /// load per catalog entry.
    pub fn has_aggregate_table(&self) -> bool {
        !matches!(self, Category::Freight | Category::Bunker)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metals" => Ok(Category::Metals),
            "agricultural" => Ok(Category::Agricultural),
            "energy" => Ok(Category::Energy),
            "freight" => Ok(Category::Freight),
            "bunker" => Ok(Category::Bunker),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Closed set of commodity sub-kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommodityKind {
    // Metals
    Gold,
    Silver,
    Copper,
    Platinum,
    Palladium,
    // Agricultural
    Corn,
    Wheat,
    Soybeans,
    Sugar,
    Coffee,
    // Energy
    Crude,
    Brent,
    NaturalGas,
    Gasoline,
    HeatingOil,
    Coal,
    // Freight
    Container,
    DryBulk,
    Tanker,
    // Bunker
    Vlsfo,
    Mgo,
    Ifo380,
    // Anything the row labels don't map to
    Other,
}

impl CommodityKind {
    /// Map a display name from a category table row onto a sub-kind.
    /// Unrecognized labels fall back to `Other` rather than dropping the row.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        match () {
            _ if lower.contains("gold") => CommodityKind::Gold,
            _ if lower.contains("silver") => CommodityKind::Silver,
            _ if lower.contains("copper") => CommodityKind::Copper,
            _ if lower.contains("platinum") => CommodityKind::Platinum,
            _ if lower.contains("palladium") => CommodityKind::Palladium,
            _ if lower.contains("corn") => CommodityKind::Corn,
            _ if lower.contains("wheat") => CommodityKind::Wheat,
            _ if lower.contains("soybean") => CommodityKind::Soybeans,
            _ if lower.contains("sugar") => CommodityKind::Sugar,
            _ if lower.contains("coffee") => CommodityKind::Coffee,
            _ if lower.contains("brent") => CommodityKind::Brent,
            _ if lower.contains("crude") || lower.contains("wti") => CommodityKind::Crude,
            _ if lower.contains("natural gas") || lower.contains("natgas") => {
                CommodityKind::NaturalGas
            }
            _ if lower.contains("gasoline") => CommodityKind::Gasoline,
            _ if lower.contains("heating oil") => CommodityKind::HeatingOil,
            _ if lower.contains("coal") => CommodityKind::Coal,
            _ if lower.contains("container") => CommodityKind::Container,
            _ if lower.contains("dry") || lower.contains("baltic") => CommodityKind::DryBulk,
            _ if lower.contains("tanker") => CommodityKind::Tanker,
            _ if lower.contains("vlsfo") => CommodityKind::Vlsfo,
            _ if lower.contains("mgo") => CommodityKind::Mgo,
            _ if lower.contains("ifo380") || lower.contains("ifo 380") => CommodityKind::Ifo380,
            _ => CommodityKind::Other,
        }
    }
}

/// Aggregated technical rating for a commodity row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechnicalEvaluation {
    Positive,
    Negative,
    Neutral,
}

impl TechnicalEvaluation {
    /// Lenient mapping from rating cell text ("Buy", "Strong sell", ...).
    /// Anything unrecognized is Neutral.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("buy") || lower.contains("positive") || lower.contains("bullish") {
            TechnicalEvaluation::Positive
        } else if lower.contains("sell") || lower.contains("negative") || lower.contains("bearish")
        {
            TechnicalEvaluation::Negative
        } else {
            TechnicalEvaluation::Neutral
        }
    }
}

impl Default for TechnicalEvaluation {
    fn default() -> Self {
        TechnicalEvaluation::Neutral
    }
}

/// The canonical output record of the extraction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commodity {
    /// Exchange ticker, unique within a category batch
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Last traded price; must be > 0 for the record to be valid
    pub price: f64,
    /// Signed percent change
    pub percent_change: f64,
    /// Signed absolute change
    pub absolute_change: f64,
    /// Session high; 0 where the target page exposes no range (freight)
    pub high: f64,
    /// Session low; 0 where the target page exposes no range
    pub low: f64,
    pub technical_evaluation: TechnicalEvaluation,
    #[serde(rename = "type")]
    pub kind: CommodityKind,
    pub category: Category,
}

impl Commodity {
    /// A record is valid only with a strictly positive price. Extraction
    /// that cannot establish one must drop the record, never emit a zero.
    pub fn is_valid(&self) -> bool {
        self.price > 0.0 && self.price.is_finite()
    }
}
