//! Parsing context for price extraction
//!
//! Carries the per-target knobs a parser needs without handing it the whole
//! target.

use crate::domain::{MonitoredTarget, PriceFilter};

/// Context information for one page parse
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    /// Target name, for log lines
    pub target_name: String,

    /// Page URL, for log lines
    pub url: String,

    /// Selector override; `None` means the site default
    pub price_selector: Option<String>,

    /// Listing price filter
    pub filter: PriceFilter,
}

impl ParseContext {
    /// Create new parse context
    pub fn new(target_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn for_target(target: &MonitoredTarget) -> Self {
        Self {
            target_name: target.name.clone(),
            url: target.url.to_string(),
            price_selector: target.price_selector.clone(),
            filter: target.filter,
        }
    }

    /// Override the price selector
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.price_selector = Some(selector.into());
        self
    }

    /// Set the listing price filter
    pub const fn with_filter(mut self, filter: PriceFilter) -> Self {
        self.filter = filter;
        self
    }
}
