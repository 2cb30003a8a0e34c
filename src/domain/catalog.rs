//! Static symbol catalogs for categories without an aggregate table
//!
//! Freight indices and bunker fuel grades have no single table page on the
//! target sites, so each catalog entry drives one page fetch. These are
//! configuration data, not computed state.

use serde::{Deserialize, Serialize};

use super::commodity::CommodityKind;

/// One freight index tracked via its exchange symbol page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreightSymbolSpec {
    /// Ticker as listed on the quote site, without an exchange prefix
    pub exchange_symbol: &'static str,
    pub display_name: &'static str,
    pub kind: CommodityKind,
}

/// Freight indices fetched one symbol page at a time
pub const FREIGHT_SYMBOLS: &[FreightSymbolSpec] = &[
    FreightSymbolSpec {
        exchange_symbol: "FBX",
        display_name: "Freightos Baltic Index (Global)",
        kind: CommodityKind::Container,
    },
    FreightSymbolSpec {
        exchange_symbol: "FBX01",
        display_name: "China/East Asia - North America West Coast",
        kind: CommodityKind::Container,
    },
    FreightSymbolSpec {
        exchange_symbol: "FBX03",
        display_name: "China/East Asia - North America East Coast",
        kind: CommodityKind::Container,
    },
    FreightSymbolSpec {
        exchange_symbol: "FBX11",
        display_name: "China/East Asia - North Europe",
        kind: CommodityKind::Container,
    },
    FreightSymbolSpec {
        exchange_symbol: "BDI",
        display_name: "Baltic Dry Index",
        kind: CommodityKind::DryBulk,
    },
    FreightSymbolSpec {
        exchange_symbol: "BDTI",
        display_name: "Baltic Dirty Tanker Index",
        kind: CommodityKind::Tanker,
    },
];

/// Ordered exchange-prefix variants tried when a bare symbol page does not
/// resolve to a positive price. The bare symbol is always attempted first.
pub const SYMBOL_PREFIX_VARIANTS: &[&str] = &["", "INDEX:", "FREIGHTOS:", "BALTIC:"];

/// Marine fuel grade identifiers used by the bunker price site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BunkerType {
    Vlsfo,
    Mgo,
    Ifo380,
}

impl BunkerType {
    /// Query-parameter value understood by the scrape service
    pub fn as_str(&self) -> &'static str {
        match self {
            BunkerType::Vlsfo => "vlsfo",
            BunkerType::Mgo => "mgo",
            BunkerType::Ifo380 => "ifo380",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vlsfo" => Some(BunkerType::Vlsfo),
            "mgo" => Some(BunkerType::Mgo),
            "ifo380" | "ifo-380" => Some(BunkerType::Ifo380),
            _ => None,
        }
    }
}

impl std::fmt::Display for BunkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bunker fuel grade tracked via its price page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BunkerTypeSpec {
    pub bunker_type: BunkerType,
    pub display_name: &'static str,
    pub kind: CommodityKind,
}

/// Bunker grades fetched one price page at a time
pub const BUNKER_TYPES: &[BunkerTypeSpec] = &[
    BunkerTypeSpec {
        bunker_type: BunkerType::Vlsfo,
        display_name: "VLSFO (0.50% Sulphur)",
        kind: CommodityKind::Vlsfo,
    },
    BunkerTypeSpec {
        bunker_type: BunkerType::Mgo,
        display_name: "MGO (Marine Gas Oil)",
        kind: CommodityKind::Mgo,
    },
    BunkerTypeSpec {
        bunker_type: BunkerType::Ifo380,
        display_name: "IFO380 (3.50% Sulphur)",
        kind: CommodityKind::Ifo380,
    },
];
