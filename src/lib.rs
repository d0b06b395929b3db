//! Pricewatch - price monitor for Swedish e-commerce sites
//!
//! Fetches Prisjakt product pages and Blocket listing searches, extracts a
//! price with a cascade of selector and text heuristics, keeps a price history
//! and sends alerts on drops or when a target price is reached.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
