//! Free-text kronor pattern extraction.
//!
//! Used when no structural selector finds a price. Patterns run over the
//! concatenated text of the whole document, most specific first. Each hit is
//! normalized under the narrow text range so page numbers, counts and similar
//! small numbers drop out.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::ops::Range;
use tracing::debug;

use super::number_normalizer::normalize_price_in;
use crate::domain::PriceRange;
use crate::domain::constants::price_bounds::PREFERRED_TEXT_PRICE_FLOOR;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static price pattern compiles"))
        .collect()
}

/// Product pages: "3 997 kr", "3,997 kr", "3997 kr", "997 kr"
static PRODUCT_PAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(\d{1,3}(?:\s\d{3})+)\s*kr",
        r"(?i)(\d{1,3}(?:,\d{3})+)\s*kr",
        r"(?i)(\d{4,6})\s*kr",
        r"(?i)(\d{1,3})\s*kr",
    ])
});

/// Listing pages also see the currency before the amount ("kr 3 997")
static LISTING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)(\d{1,3}(?:\s\d{3})+)\s*kr",
        r"(?i)(\d+)\s*kr",
        r"(?i)kr\s*(\d{1,3}(?:\s\d{3})+)",
        r"(?i)kr\s*(\d+)",
        r"(?i)(\d+(?:,\d{3})+)\s*kr",
    ])
});

/// Concatenated text of every node in the document
pub fn page_text(html: &Html) -> String {
    html.root_element().text().collect()
}

/// An ordered pattern set plus the range its hits must fall in
#[derive(Debug, Clone, Copy)]
pub struct TextPatternExtractor {
    patterns: &'static [Regex],
    range: PriceRange,
}

impl TextPatternExtractor {
    pub fn product_page() -> Self {
        Self {
            patterns: PRODUCT_PAGE_PATTERNS.as_slice(),
            range: PriceRange::text_pattern(),
        }
    }

    pub fn listing() -> Self {
        Self {
            patterns: LISTING_PATTERNS.as_slice(),
            range: PriceRange::listing(),
        }
    }

    /// Every accepted hit, pattern by pattern, in match order.
    ///
    /// Text matched by an earlier pattern is claimed, so "3 997 kr" never
    /// also yields "997 kr" from a looser pattern. Out of range matches claim
    /// their text too.
    pub fn all_prices(&self, text: &str) -> Vec<f64> {
        let mut prices = Vec::new();
        let mut claimed: Vec<Range<usize>> = Vec::new();

        for (i, pattern) in self.patterns.iter().enumerate() {
            let before = prices.len();
            let mut spans = Vec::new();

            for caps in pattern.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                let span = whole.range();
                if claimed.iter().any(|c| c.start < span.end && span.start < c.end) {
                    continue;
                }
                spans.push(span);
                if let Some(price) = caps
                    .get(1)
                    .and_then(|m| normalize_price_in(m.as_str(), self.range))
                {
                    prices.push(price);
                }
            }

            claimed.extend(spans);
            if prices.len() > before {
                debug!("Pattern {} found {} prices", i + 1, prices.len() - before);
            }
        }
        prices
    }

    /// Most likely single price in `text`.
    ///
    /// The largest hit of at least 1000 kr, otherwise the largest hit. A guess:
    /// real pages also mention shipping costs, savings and monthly prices.
    pub fn best_price(&self, text: &str) -> Option<f64> {
        let prices = self.all_prices(text);
        let preferred = prices
            .iter()
            .copied()
            .filter(|&p| p >= PREFERRED_TEXT_PRICE_FLOOR)
            .reduce(f64::max);
        preferred.or_else(|| prices.into_iter().reduce(f64::max))
    }
}
