//! Application layer
//!
//! Orchestrates the acquisition pipeline on behalf of consumers: cache
//! consultation, tier composition, category routing and cache writes.

pub mod price_service;

pub use price_service::PriceService;
