//! Domain module - Core data model and static catalogs
//!
//! This module contains the canonical `Commodity` record produced by the
//! extraction pipeline, the category/kind vocabulary, and the static
//! symbol catalogs driving multi-page categories (freight, bunker).
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod catalog;
pub mod commodity;

// Re-export commonly used items for convenience
pub use catalog::{BunkerType, BunkerTypeSpec, FreightSymbolSpec, BUNKER_TYPES, FREIGHT_SYMBOLS};
pub use commodity::{Category, Commodity, CommodityKind, TechnicalEvaluation};
