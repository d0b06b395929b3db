//! Selector-based price extraction

use scraper::Html;
use tracing::trace;

use super::number_normalizer::normalize_price_in;
use super::price_selector::{PriceSelector, element_text};
use crate::domain::PriceRange;

/// First element, in document order, whose text normalizes into `range`.
///
/// Elements without text or without digits are skipped.
pub fn first_price(html: &Html, selector: &PriceSelector, range: PriceRange) -> Option<f64> {
    selector.select(html).find_map(|element| {
        let text = element_text(&element);
        if text.is_empty() {
            return None;
        }
        let price = normalize_price_in(&text, range);
        trace!("{} -> '{}' -> {:?}", selector.as_str(), text, price);
        price
    })
}

/// Every element's price under `range`, in document order
pub fn all_prices(html: &Html, selector: &PriceSelector, range: PriceRange) -> Vec<f64> {
    selector
        .select(html)
        .filter_map(|element| normalize_price_in(&element_text(&element), range))
        .collect()
}

pub fn element_count(html: &Html, selector: &PriceSelector) -> usize {
    selector.select(html).count()
}

/// Text of the first matching element, cut to `max_chars` characters
pub fn sample_text(html: &Html, selector: &PriceSelector, max_chars: usize) -> Option<String> {
    selector.select(html).next().map(|element| {
        let text = element_text(&element);
        if text.chars().count() > max_chars {
            let cut: String = text.chars().take(max_chars).collect();
            format!("{cut}...")
        } else {
            text
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="price"></div>
        <div class="price">Slutsåld</div>
        <div class="price">2 499 kr</div>
        <div class="price">1 999 kr</div>
        <div class="price">49 kr</div>
    "#;

    fn price_selector() -> PriceSelector {
        PriceSelector::parse(".price").unwrap()
    }

    #[test]
    fn test_first_price_skips_empty_and_non_numeric() {
        let html = Html::parse_fragment(PAGE);
        assert_eq!(
            first_price(&html, &price_selector(), PriceRange::selector()),
            Some(2499.0)
        );
    }

    #[test]
    fn test_all_prices_respects_range() {
        let html = Html::parse_fragment(PAGE);
        assert_eq!(
            all_prices(&html, &price_selector(), PriceRange::selector()),
            vec![2499.0, 1999.0, 49.0]
        );
        assert_eq!(
            all_prices(&html, &price_selector(), PriceRange::listing()),
            vec![2499.0, 1999.0]
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let html = Html::parse_fragment(PAGE);
        let missing = PriceSelector::parse(".price-large").unwrap();
        assert_eq!(first_price(&html, &missing, PriceRange::selector()), None);
        assert_eq!(element_count(&html, &missing), 0);
        assert_eq!(sample_text(&html, &missing, 100), None);
    }

    #[test]
    fn test_sample_text_is_truncated() {
        let long = format!("<p class=\"price\">{}</p>", "9".repeat(150));
        let html = Html::parse_fragment(&long);
        let sample = sample_text(&html, &price_selector(), 100).unwrap();
        assert_eq!(sample.len(), 103);
        assert!(sample.ends_with("..."));
        assert_eq!(element_count(&html, &price_selector()), 1);
    }
}
