//! Listing page parser (Blocket search results)
//!
//! Pools the prices of every listed item, applies the target's min/max filter
//! and picks the cheapest remaining item.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use super::price_selector::{PriceSelector, SelectorStep, compile_selectors};
use super::selector_extractor::all_prices;
use super::text_pattern_extractor::{TextPatternExtractor, page_text};
use super::{ContextualParser, ParseContext, ParsingResult};
use crate::domain::constants::selectors::LISTING_PRICE_SELECTORS;
use crate::domain::{CandidatePrice, ExtractionOutcome, ExtractionSource, PriceFilter, PriceRange};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("static selector"));

/// Where the pooled prices came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrigin {
    Selectors,
    Text,
}

/// Unique listing prices, ascending
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedPrices {
    pub prices: Vec<f64>,
    pub origin: PriceOrigin,
}

impl CollectedPrices {
    pub fn new(mut prices: Vec<f64>, origin: PriceOrigin) -> Self {
        prices.sort_by(f64::total_cmp);
        prices.dedup();
        Self { prices, origin }
    }

    /// Cheapest price inside `filter`, or why there is none
    pub fn select_best(&self, filter: &PriceFilter) -> ExtractionOutcome {
        let (Some(&lowest), Some(&highest)) = (self.prices.first(), self.prices.last()) else {
            return ExtractionOutcome::NoPriceFound;
        };

        let in_range: Vec<f64> = self
            .prices
            .iter()
            .copied()
            .filter(|&p| filter.contains(p))
            .collect();

        match in_range.first() {
            Some(&best) => {
                let candidates = in_range.len();
                let source = match self.origin {
                    PriceOrigin::Selectors => ExtractionSource::ListingSelectors { candidates },
                    PriceOrigin::Text => ExtractionSource::ListingText { candidates },
                };
                ExtractionOutcome::Resolved(CandidatePrice::new(best, source))
            }
            None => ExtractionOutcome::OutsideFilterRange {
                found: self.prices.len(),
                lowest,
                highest,
            },
        }
    }
}

/// Parser for pages that list many items
#[derive(Debug, Clone)]
pub struct ListingParser {
    price_selectors: Vec<PriceSelector>,
    text_patterns: TextPatternExtractor,
}

impl ListingParser {
    /// Create a new listing parser with the default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_selectors(LISTING_PRICE_SELECTORS)
    }

    /// Create parser with custom selectors
    pub fn with_selectors<S: AsRef<str>>(selectors: &[S]) -> ParsingResult<Self> {
        Ok(Self {
            price_selectors: compile_selectors(selectors)?,
            text_patterns: TextPatternExtractor::listing(),
        })
    }

    /// Every plausible price on the page.
    ///
    /// All selectors run against all their matches; the text patterns only
    /// run when the selectors found nothing.
    pub fn collect_prices(&self, html: &Html) -> CollectedPrices {
        self.collect_prices_with(html, None)
    }

    /// Like [`Self::collect_prices`], trying the target's own selector first.
    ///
    /// Prices found by a CSS override are used alone. An override that finds
    /// nothing falls back to the default selectors; `text_search_kr` goes
    /// straight to the page text.
    pub fn collect_prices_with(
        &self,
        html: &Html,
        configured: Option<&SelectorStep>,
    ) -> CollectedPrices {
        match configured {
            Some(SelectorStep::Css(selector)) => {
                let found = all_prices(html, selector, PriceRange::listing());
                if !found.is_empty() {
                    debug!(
                        "Found {} prices with configured selector: {}",
                        found.len(),
                        selector.as_str()
                    );
                    return CollectedPrices::new(found, PriceOrigin::Selectors);
                }
                debug!("Configured selector {} found nothing, trying defaults", selector.as_str());
            }
            Some(SelectorStep::TextSearch) => return self.collect_from_text(html),
            None => {}
        }

        let mut prices = Vec::new();
        debug!("Searching for prices with {} selectors", self.price_selectors.len());

        for selector in &self.price_selectors {
            let found = all_prices(html, selector, PriceRange::listing());
            if !found.is_empty() {
                debug!("Found {} prices with selector: {}", found.len(), selector.as_str());
                prices.extend(found);
            }
        }

        if !prices.is_empty() {
            return CollectedPrices::new(prices, PriceOrigin::Selectors);
        }

        debug!("No prices found with selectors, trying text extraction");
        self.collect_from_text(html)
    }

    fn collect_from_text(&self, html: &Html) -> CollectedPrices {
        let text = page_text(html);
        CollectedPrices::new(self.text_patterns.all_prices(&text), PriceOrigin::Text)
    }

    /// Parse raw HTML
    pub fn parse_html(&self, html: &str, context: &ParseContext) -> ParsingResult<ExtractionOutcome> {
        let document = Html::parse_document(html);
        self.parse_with_context(&document, context)
    }
}

/// Title mentioning robots, or a captcha anywhere in the text
pub fn looks_like_bot_challenge(html: &Html) -> bool {
    let title_hit = html
        .select(&TITLE)
        .next()
        .is_some_and(|t| t.text().collect::<String>().to_lowercase().contains("robot"));
    title_hit || page_text(html).to_lowercase().contains("captcha")
}

impl ContextualParser for ListingParser {
    type Output = ExtractionOutcome;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        if looks_like_bot_challenge(html) {
            warn!("Possible bot detection page for {}", context.target_name);
        }

        let configured = context
            .price_selector
            .as_deref()
            .map(SelectorStep::parse)
            .transpose()?;
        let collected = self.collect_prices_with(html, configured.as_ref());
        let preview: Vec<f64> = collected.prices.iter().take(10).copied().collect();
        info!("Extracted {} unique prices: {:?}", collected.prices.len(), preview);

        let outcome = collected.select_best(&context.filter);
        match &outcome {
            ExtractionOutcome::Resolved(candidate) => info!(
                "{}: best price {} SEK via {}",
                context.target_name, candidate.value, candidate.source
            ),
            ExtractionOutcome::OutsideFilterRange { found, .. } => info!(
                "Found {} items for {}, but none in specified price range",
                found, context.target_name
            ),
            ExtractionOutcome::NoPriceFound => {
                warn!("Could not find any prices for {}", context.target_name);
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collected(prices: &[f64]) -> CollectedPrices {
        CollectedPrices::new(prices.to_vec(), PriceOrigin::Selectors)
    }

    #[test]
    fn test_minimum_within_filter() {
        let outcome = collected(&[2200.0, 450.0, 1500.0, 999.0])
            .select_best(&PriceFilter::new(Some(900.0), Some(2000.0)));
        assert_eq!(
            outcome,
            ExtractionOutcome::Resolved(CandidatePrice::new(
                999.0,
                ExtractionSource::ListingSelectors { candidates: 2 }
            ))
        );
    }

    #[test]
    fn test_outside_filter_is_distinct_from_nothing() {
        let filter = PriceFilter::new(Some(900.0), None);
        assert_eq!(
            collected(&[450.0]).select_best(&filter),
            ExtractionOutcome::OutsideFilterRange {
                found: 1,
                lowest: 450.0,
                highest: 450.0
            }
        );
        assert_eq!(collected(&[]).select_best(&filter), ExtractionOutcome::NoPriceFound);
    }

    #[test]
    fn test_prices_are_deduplicated_and_sorted() {
        assert_eq!(collected(&[1500.0, 999.0, 1500.0]).prices, vec![999.0, 1500.0]);
    }

    #[test]
    fn test_collects_every_item() {
        let html = Html::parse_document(
            r#"<ul>
                <li><span class="item-price">1 500 kr</span></li>
                <li><span class="item-price">999 kr</span></li>
                <li><span class="item-price">50 kr</span></li>
            </ul>"#,
        );
        let collected = ListingParser::new().unwrap().collect_prices(&html);
        // "item-price" also matches [class*="price"]; duplicates collapse
        assert_eq!(collected.prices, vec![999.0, 1500.0]);
        assert_eq!(collected.origin, PriceOrigin::Selectors);
    }

    #[test]
    fn test_text_fallback_collects_all_matches() {
        let html = Html::parse_document("<p>Soffa 2 500 kr</p><p>Bord kr 800</p>");
        let collected = ListingParser::new().unwrap().collect_prices(&html);
        assert_eq!(collected.origin, PriceOrigin::Text);
        assert!(collected.prices.contains(&800.0));
        assert!(collected.prices.contains(&2500.0));
    }

    #[test]
    fn test_spaced_price_in_text_is_read_whole() {
        let context = ParseContext::new("Soffa", "https://www.blocket.se/annonser/skane?q=soffa");
        let outcome = ListingParser::new()
            .unwrap()
            .parse_html("<li>Soffa, 3 997 kr, Malmö</li>", &context)
            .unwrap();
        assert_eq!(
            outcome,
            ExtractionOutcome::Resolved(CandidatePrice::new(
                3997.0,
                ExtractionSource::ListingText { candidates: 1 }
            ))
        );
    }

    const FEATURED_PAGE: &str = r#"
        <section class="featured"><span class="item-price">5 400 kr</span></section>
        <section class="results">
            <span class="item-price">1 200 kr</span>
            <span class="item-price">2 300 kr</span>
        </section>
        <p>Annonsera från 49 kr, toppannons kr 1 500</p>"#;

    #[test]
    fn test_configured_selector_comes_first() {
        let parser = ListingParser::new().unwrap();
        let base = ParseContext::new("Soffa", "https://www.blocket.se/annonser/skane?q=soffa");

        let defaults = parser.parse_html(FEATURED_PAGE, &base).unwrap();
        assert_eq!(defaults.price().map(|c| c.value), Some(1200.0));

        let featured = parser
            .parse_html(FEATURED_PAGE, &base.clone().with_selector(".featured .item-price"))
            .unwrap();
        assert_eq!(
            featured,
            ExtractionOutcome::Resolved(CandidatePrice::new(
                5400.0,
                ExtractionSource::ListingSelectors { candidates: 1 }
            ))
        );

        // an override that matches nothing falls back to the defaults
        let missing = parser
            .parse_html(FEATURED_PAGE, &base.clone().with_selector(".sold-out .item-price"))
            .unwrap();
        assert_eq!(missing.price().map(|c| c.value), Some(1200.0));

        let text = parser
            .parse_html(FEATURED_PAGE, &base.with_selector("text_search_kr"))
            .unwrap();
        assert!(matches!(
            text.price().map(|c| &c.source),
            Some(ExtractionSource::ListingText { .. })
        ));
    }

    #[test]
    fn test_invalid_configured_selector_is_an_error() {
        let context = ParseContext::new("Soffa", "https://www.blocket.se/annonser/skane?q=soffa")
            .with_selector("[[[");
        assert!(ListingParser::new().unwrap().parse_html(FEATURED_PAGE, &context).is_err());
    }

    #[test]
    fn test_context_filter_applies() {
        let html = r#"<span class="item-price">999 kr</span><span class="item-price">4 200 kr</span>"#;
        let context = ParseContext::new("Cykel", "https://www.blocket.se/annonser/hela_sverige?q=cykel")
            .with_filter(PriceFilter::new(Some(1000.0), Some(5000.0)));
        let outcome = ListingParser::new().unwrap().parse_html(html, &context).unwrap();
        assert_eq!(outcome.price().map(|c| c.value), Some(4200.0));
    }

    #[test]
    fn test_bot_challenge_detection() {
        let challenge = Html::parse_document("<title>Are you a robot?</title><p>Solve the CAPTCHA</p>");
        assert!(looks_like_bot_challenge(&challenge));
        let normal = Html::parse_document("<title>Soffor | Blocket</title>");
        assert!(!looks_like_bot_challenge(&normal));
    }
}
