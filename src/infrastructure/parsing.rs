//! HTML price extraction
//!
//! Trait-based parsers over `scraper` documents. Product pages run a selector
//! cascade for one price; listing pages pool every item's price and pick the
//! cheapest one inside the target's filter.

pub mod context;
pub mod error;
pub mod listing_parser;
pub mod number_normalizer;
pub mod price_selector;
pub mod product_page_parser;
pub mod selector_extractor;
pub mod text_pattern_extractor;

// Re-export public types
pub use context::ParseContext;
pub use error::{ParsingError, ParsingResult};
pub use listing_parser::{ListingParser, looks_like_bot_challenge};
pub use number_normalizer::{normalize_price, normalize_price_in};
pub use price_selector::{PriceSelector, SelectorStep, compile_selectors, compile_steps};
pub use product_page_parser::ProductPageParser;
pub use text_pattern_extractor::TextPatternExtractor;

use scraper::Html;

/// Parser with per-call context
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}
