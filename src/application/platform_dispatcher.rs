//! Per-site extraction strategy selection
//!
//! One extractor per platform, built on first use and reused for the rest of
//! the run.

use scraper::Html;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{ExtractionOutcome, MonitoredTarget, Platform};
use crate::infrastructure::parsing::{
    ContextualParser, ListingParser, ParseContext, ParsingResult, ProductPageParser,
};

/// Extraction strategy of one site
#[derive(Debug, Clone)]
pub enum SiteExtractor {
    /// Single-item cascade
    ProductPage(ProductPageParser),
    /// Pool, filter, pick the minimum
    Listing(ListingParser),
}

impl SiteExtractor {
    pub fn for_platform(platform: Platform) -> ParsingResult<Self> {
        Ok(match platform {
            Platform::Prisjakt => Self::ProductPage(ProductPageParser::new()?),
            Platform::Blocket => Self::Listing(ListingParser::new()?),
        })
    }
}

impl ContextualParser for SiteExtractor {
    type Output = ExtractionOutcome;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        match self {
            Self::ProductPage(parser) => parser.parse_with_context(html, context),
            Self::Listing(parser) => parser.parse_with_context(html, context),
        }
    }
}

/// Routes pages to their site's extractor
#[derive(Debug, Default)]
pub struct PlatformDispatcher {
    extractors: HashMap<Platform, Arc<SiteExtractor>>,
}

impl PlatformDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached extractor for `platform`, built on first request
    pub fn extractor(&mut self, platform: Platform) -> ParsingResult<Arc<SiteExtractor>> {
        if let Some(extractor) = self.extractors.get(&platform) {
            return Ok(Arc::clone(extractor));
        }

        debug!("Creating extractor for {}", platform);
        let extractor = Arc::new(SiteExtractor::for_platform(platform)?);
        self.extractors.insert(platform, Arc::clone(&extractor));
        Ok(extractor)
    }

    /// Extract the target's price from a fetched page body
    pub fn extract(&mut self, target: &MonitoredTarget, html: &str) -> ParsingResult<ExtractionOutcome> {
        let extractor = self.extractor(target.platform)?;
        let document = Html::parse_document(html);
        extractor.parse_with_context(&document, &ParseContext::for_target(target))
    }

    pub fn cached_platforms(&self) -> usize {
        self.extractors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceFilter;

    fn target(platform: Platform, filter: PriceFilter) -> MonitoredTarget {
        MonitoredTarget {
            name: "Cykel".to_string(),
            url: "https://www.blocket.se/annonser/hela_sverige?q=cykel".parse().unwrap(),
            platform,
            price_selector: None,
            target_price: None,
            filter,
        }
    }

    #[test]
    fn test_one_extractor_per_platform() {
        let mut dispatcher = PlatformDispatcher::new();
        let first = dispatcher.extractor(Platform::Blocket).unwrap();
        let second = dispatcher.extractor(Platform::Blocket).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        for platform in Platform::ALL {
            dispatcher.extractor(platform).unwrap();
        }
        assert_eq!(dispatcher.cached_platforms(), Platform::ALL.len());
    }

    #[test]
    fn test_routes_by_platform() {
        let html = r#"<div class="price-large">4 990 kr</div>
            <span class="item-price">1 200 kr</span>
            <span class="item-price">800 kr</span>"#;
        let mut dispatcher = PlatformDispatcher::new();

        let single = dispatcher
            .extract(&target(Platform::Prisjakt, PriceFilter::default()), html)
            .unwrap();
        assert_eq!(single.price().map(|c| c.value), Some(4990.0));

        let listing = dispatcher
            .extract(&target(Platform::Blocket, PriceFilter::new(Some(1000.0), None)), html)
            .unwrap();
        assert_eq!(listing.price().map(|c| c.value), Some(1200.0));
    }
}
