//! Domain module - Core business logic and entities
//!
//! This module contains the monitored targets, price values and observation
//! records that the extraction and monitoring layers exchange.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod constants;
pub mod price;
pub mod repositories;
pub mod target;

// Re-export commonly used items for convenience
pub use price::{
    CandidatePrice, ExtractionOutcome, ExtractionSource, NotifyReason, PriceRange, PriceRecord,
};
pub use repositories::PriceHistoryRepository;
pub use target::{MonitoredTarget, Platform, PriceFilter, TargetDefinition, TargetError};
