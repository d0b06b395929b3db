//! Single-item product page parser (Prisjakt)
//!
//! Runs the cascade configured selector → fallback selectors → text search and
//! stops at the first price found.

use scraper::Html;
use tracing::{debug, info};

use super::price_selector::{SelectorStep, compile_steps};
use super::selector_extractor::first_price;
use super::text_pattern_extractor::{TextPatternExtractor, page_text};
use super::{ContextualParser, ParseContext, ParsingResult};
use crate::domain::constants::selectors::{
    DEFAULT_PRODUCT_PRICE_SELECTOR, PRODUCT_PAGE_FALLBACKS,
};
use crate::domain::{CandidatePrice, ExtractionOutcome, ExtractionSource, PriceRange};

/// Parser for product pages that show exactly one item
#[derive(Debug, Clone)]
pub struct ProductPageParser {
    fallback_steps: Vec<SelectorStep>,
    text_patterns: TextPatternExtractor,
}

impl ProductPageParser {
    /// Create a new parser with the default fallback selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_fallbacks(PRODUCT_PAGE_FALLBACKS)
    }

    /// Create parser with a custom fallback list
    pub fn with_fallbacks<S: AsRef<str>>(fallbacks: &[S]) -> ParsingResult<Self> {
        Ok(Self {
            fallback_steps: compile_steps(fallbacks)?,
            text_patterns: TextPatternExtractor::product_page(),
        })
    }

    /// Compile the selector the context asks for, or the site default
    pub fn configured_step(context: &ParseContext) -> ParsingResult<SelectorStep> {
        SelectorStep::parse(
            context
                .price_selector
                .as_deref()
                .unwrap_or(DEFAULT_PRODUCT_PRICE_SELECTOR),
        )
    }

    /// Run one step; `None` means "try the next one"
    fn run_step(&self, html: &Html, step: &SelectorStep, text: &mut Option<String>) -> Option<f64> {
        match step {
            SelectorStep::Css(selector) => first_price(html, selector, PriceRange::selector()),
            SelectorStep::TextSearch => {
                let text = text.get_or_insert_with(|| page_text(html));
                self.text_patterns.best_price(text)
            }
        }
    }

    /// Parse raw HTML
    pub fn parse_html(&self, html: &str, context: &ParseContext) -> ParsingResult<ExtractionOutcome> {
        let document = Html::parse_document(html);
        self.parse_with_context(&document, context)
    }
}

impl ContextualParser for ProductPageParser {
    type Output = ExtractionOutcome;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let configured = Self::configured_step(context)?;
        let mut text: Option<String> = None;

        if let Some(value) = self.run_step(html, &configured, &mut text) {
            let source = match &configured {
                SelectorStep::Css(selector) => ExtractionSource::ConfiguredSelector {
                    selector: selector.as_str().to_string(),
                },
                SelectorStep::TextSearch => ExtractionSource::TextPattern,
            };
            debug!("{}: price {} via {}", context.target_name, value, source);
            return Ok(ExtractionOutcome::Resolved(CandidatePrice::new(value, source)));
        }

        let mut text_tried = matches!(configured, SelectorStep::TextSearch);
        for step in &self.fallback_steps {
            if step.label() == configured.label() {
                continue;
            }
            if matches!(step, SelectorStep::TextSearch) {
                if text_tried {
                    continue;
                }
                text_tried = true;
            }

            if let Some(value) = self.run_step(html, step, &mut text) {
                let source = match step {
                    SelectorStep::Css(selector) => ExtractionSource::FallbackSelector {
                        selector: selector.as_str().to_string(),
                    },
                    SelectorStep::TextSearch => ExtractionSource::TextPattern,
                };
                info!(
                    "{}: found price using alternative selector: {}",
                    context.target_name,
                    step.label()
                );
                return Ok(ExtractionOutcome::Resolved(CandidatePrice::new(value, source)));
            }
        }

        if !text_tried {
            if let Some(value) = self.run_step(html, &SelectorStep::TextSearch, &mut text) {
                return Ok(ExtractionOutcome::Resolved(CandidatePrice::new(
                    value,
                    ExtractionSource::TextPattern,
                )));
            }
        }

        Ok(ExtractionOutcome::NoPriceFound)
    }
}
