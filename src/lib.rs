//! Commodity Crawler - Near-Real-Time Commodity Price Acquisition
//!
//! This crate acquires commodity price data (metals, agricultural goods,
//! energy, freight indices, marine bunker fuel) by driving a headless
//! browser against market-data sites without public APIs, then extracts
//! normalized price records from the rendered markup.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
