//! Price values produced by extraction and the observation records built
//! from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::price_bounds;
use super::target::MonitoredTarget;

/// Inclusive plausibility range a normalized price must fall in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range for values read from structural selectors
    pub const fn selector() -> Self {
        Self::new(price_bounds::SELECTOR_MIN, price_bounds::SELECTOR_MAX)
    }

    /// Narrow range for values found in free text
    pub const fn text_pattern() -> Self {
        Self::new(price_bounds::TEXT_PATTERN_MIN, price_bounds::TEXT_PATTERN_MAX)
    }

    /// Range for every value collected from a listing page
    pub const fn listing() -> Self {
        Self::new(price_bounds::LISTING_MIN, price_bounds::LISTING_MAX)
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Which strategy produced a price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionSource {
    /// The target's own (or the site default) selector
    ConfiguredSelector { selector: String },
    /// One of the fallback selectors
    FallbackSelector { selector: String },
    /// Kronor patterns over the page text
    TextPattern,
    /// Pooled hits of the listing selectors
    ListingSelectors { candidates: usize },
    /// Pooled hits of the listing text patterns
    ListingText { candidates: usize },
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfiguredSelector { selector } => write!(f, "selector '{selector}'"),
            Self::FallbackSelector { selector } => write!(f, "fallback selector '{selector}'"),
            Self::TextPattern => f.write_str("text search"),
            Self::ListingSelectors { candidates } => {
                write!(f, "listing selectors ({candidates} unique prices)")
            }
            Self::ListingText { candidates } => {
                write!(f, "listing text search ({candidates} unique prices)")
            }
        }
    }
}

/// A price tagged with the strategy that found it
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePrice {
    pub value: f64,
    pub source: ExtractionSource,
}

impl CandidatePrice {
    pub const fn new(value: f64, source: ExtractionSource) -> Self {
        Self { value, source }
    }
}

/// Result of running one site's extraction cascade over a page.
///
/// None of the variants is an error: a miss is a legitimate answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Resolved(CandidatePrice),
    /// Every strategy came back empty
    NoPriceFound,
    /// Listing prices exist, but the target's min/max filter removed all of them
    OutsideFilterRange {
        found: usize,
        lowest: f64,
        highest: f64,
    },
}

impl ExtractionOutcome {
    pub const fn price(&self) -> Option<&CandidatePrice> {
        match self {
            Self::Resolved(candidate) => Some(candidate),
            _ => None,
        }
    }

    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Why an observation deserves a notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotifyReason {
    TargetReached,
    PriceDropped { previous: f64 },
    FirstObservation,
}

/// One stored observation of a target's price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub product_name: String,
    pub current_price: f64,
    #[serde(default)]
    pub previous_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    #[serde(default)]
    pub price_dropped: bool,
    #[serde(default)]
    pub target_price_reached: bool,
}

impl PriceRecord {
    pub fn new(target: &MonitoredTarget, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            product_name: target.name.clone(),
            current_price: price,
            previous_price: None,
            timestamp,
            url: target.url.to_string(),
            price_dropped: false,
            target_price_reached: target.target_reached(price),
        }
    }

    /// Compares against the latest stored record and decides whether to notify.
    ///
    /// A drop fills `previous_price` and `price_dropped` even when the target
    /// was reached too; the reason reported is the strongest one.
    pub fn compare_with(&mut self, previous: Option<&PriceRecord>) -> Option<NotifyReason> {
        let dropped = previous
            .map(|p| p.current_price)
            .filter(|&prev| self.current_price < prev);

        if let Some(prev) = dropped {
            self.price_dropped = true;
            self.previous_price = Some(prev);
        }

        if self.target_price_reached {
            return Some(NotifyReason::TargetReached);
        }
        if let Some(prev) = dropped {
            return Some(NotifyReason::PriceDropped { previous: prev });
        }
        if previous.is_none() {
            return Some(NotifyReason::FirstObservation);
        }
        None
    }

    /// Amount saved compared to the previous observation
    pub fn drop_amount(&self) -> Option<f64> {
        self.previous_price
            .filter(|_| self.price_dropped)
            .map(|prev| prev - self.current_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::target::{PriceFilter, Platform};

    fn target(target_price: Option<f64>) -> MonitoredTarget {
        MonitoredTarget {
            name: "Fjällräven Kånken".to_string(),
            url: "https://www.prisjakt.nu/produkt.php?p=42".parse().unwrap(),
            platform: Platform::Prisjakt,
            price_selector: None,
            target_price,
            filter: PriceFilter::default(),
        }
    }

    fn record(price: f64, target_price: Option<f64>) -> PriceRecord {
        PriceRecord::new(&target(target_price), price, Utc::now())
    }

    #[test]
    fn test_ranges() {
        assert!(!PriceRange::text_pattern().contains(50.0));
        assert!(PriceRange::selector().contains(50.0));
        assert!(PriceRange::selector().contains(0.0));
        assert!(!PriceRange::selector().contains(-1.0));
        assert!(!PriceRange::selector().contains(f64::NAN));
    }

    #[test]
    fn test_first_observation_notifies() {
        let mut current = record(899.0, None);
        assert_eq!(current.compare_with(None), Some(NotifyReason::FirstObservation));
        assert!(!current.price_dropped);
    }

    #[test]
    fn test_drop_is_recorded() {
        let previous = record(999.0, None);
        let mut current = record(899.0, None);
        assert_eq!(
            current.compare_with(Some(&previous)),
            Some(NotifyReason::PriceDropped { previous: 999.0 })
        );
        assert_eq!(current.previous_price, Some(999.0));
        assert_eq!(current.drop_amount(), Some(100.0));
    }

    #[test]
    fn test_unchanged_or_higher_price_is_silent() {
        let previous = record(899.0, None);
        let mut same = record(899.0, None);
        assert_eq!(same.compare_with(Some(&previous)), None);
        let mut higher = record(950.0, None);
        assert_eq!(higher.compare_with(Some(&previous)), None);
        assert_eq!(higher.drop_amount(), None);
    }

    #[test]
    fn test_target_reached_takes_precedence() {
        let previous = record(999.0, Some(900.0));
        let mut current = record(899.0, Some(900.0));
        assert!(current.target_price_reached);
        assert_eq!(
            current.compare_with(Some(&previous)),
            Some(NotifyReason::TargetReached)
        );
        assert!(current.price_dropped);
    }
}
