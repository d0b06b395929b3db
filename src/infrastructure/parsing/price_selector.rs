//! Compiled price selectors.
//!
//! `scraper` speaks plain CSS. Price selectors in the wild also use the
//! jQuery-style `:contains('kr')` filter, so a trailing `:contains(...)` is
//! split off and applied to the element text after matching.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{ParsingError, ParsingResult};
use crate::domain::constants::selectors::TEXT_SEARCH_KEYWORD;

static CONTAINS_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#":contains\(\s*['"]([^'"]*)['"]\s*\)\s*$"#).expect("static regex compiles")
});

/// One CSS selector plus an optional text filter
#[derive(Debug, Clone)]
pub struct PriceSelector {
    raw: String,
    selector: Selector,
    contains: Option<String>,
}

impl PriceSelector {
    pub fn parse(raw: &str) -> ParsingResult<Self> {
        let raw = raw.trim();
        let (css, contains) = match CONTAINS_SUFFIX.captures(raw) {
            Some(caps) => {
                let whole = caps.get(0).map_or(raw.len(), |m| m.start());
                let needle = caps.get(1).map(|m| m.as_str().to_string());
                (&raw[..whole], needle)
            }
            None => (raw, None),
        };

        if css.contains(":contains(") {
            return Err(ParsingError::invalid_selector(
                raw,
                "only a trailing :contains() filter is supported",
            ));
        }

        let css = if css.trim().is_empty() { "*" } else { css.trim() };
        let selector =
            Selector::parse(css).map_err(|e| ParsingError::invalid_selector(raw, e))?;

        Ok(Self {
            raw: raw.to_string(),
            selector,
            contains,
        })
    }

    /// Selector text as configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matching elements in document order
    pub fn select<'a>(&'a self, html: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        html.select(&self.selector)
            .filter(move |element| self.accepts(element))
    }

    fn accepts(&self, element: &ElementRef<'_>) -> bool {
        self.contains
            .as_deref()
            .is_none_or(|needle| element_text(element).contains(needle))
    }
}

/// One step of a selector cascade
#[derive(Debug, Clone)]
pub enum SelectorStep {
    Css(PriceSelector),
    /// Search the page text with the kronor patterns instead
    TextSearch,
}

impl SelectorStep {
    pub fn parse(raw: &str) -> ParsingResult<Self> {
        if raw.trim() == TEXT_SEARCH_KEYWORD {
            Ok(Self::TextSearch)
        } else {
            PriceSelector::parse(raw).map(Self::Css)
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Css(selector) => selector.as_str(),
            Self::TextSearch => TEXT_SEARCH_KEYWORD,
        }
    }
}

/// Compile a selector list, skipping entries that do not compile.
///
/// Fails only when nothing compiles.
pub fn compile_steps<S: AsRef<str>>(selector_strings: &[S]) -> ParsingResult<Vec<SelectorStep>> {
    let mut steps = Vec::new();
    let mut errors = Vec::new();

    for raw in selector_strings {
        match SelectorStep::parse(raw.as_ref()) {
            Ok(step) => steps.push(step),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", raw.as_ref(), e);
                errors.push(format!("'{}': {}", raw.as_ref(), e));
            }
        }
    }

    if steps.is_empty() {
        return Err(ParsingError::NoValidSelectors { errors });
    }

    if !errors.is_empty() {
        debug!("Some selectors failed to compile: {}", errors.join(", "));
    }

    Ok(steps)
}

/// Compile CSS-only selectors (listing pages have no text-search step)
pub fn compile_selectors<S: AsRef<str>>(selector_strings: &[S]) -> ParsingResult<Vec<PriceSelector>> {
    let steps = compile_steps(selector_strings)?;
    let selectors: Vec<PriceSelector> = steps
        .into_iter()
        .filter_map(|step| match step {
            SelectorStep::Css(selector) => Some(selector),
            SelectorStep::TextSearch => None,
        })
        .collect();

    if selectors.is_empty() {
        return Err(ParsingError::configuration(
            "selectors",
            "listing selectors must contain at least one CSS selector",
        ));
    }
    Ok(selectors)
}

/// Visible text of an element, trimmed
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PAGE: &str = r#"
        <html><body>
            <span class="label">Lagerstatus</span>
            <span class="amount">1 299 kr</span>
            <strong>Spara 200 kr</strong>
        </body></html>
    "#;

    #[rstest]
    #[case("span:contains('kr')", Some("kr"))]
    #[case("strong:contains(\"kr\")", Some("kr"))]
    #[case(".price-box .price", None)]
    fn test_contains_suffix_is_split(#[case] raw: &str, #[case] needle: Option<&str>) {
        let selector = PriceSelector::parse(raw).unwrap();
        assert_eq!(selector.contains.as_deref(), needle);
        assert_eq!(selector.as_str(), raw);
    }

    #[test]
    fn test_contains_filters_elements() {
        let html = Html::parse_document(PAGE);
        let selector = PriceSelector::parse("span:contains('kr')").unwrap();
        let texts: Vec<String> = selector.select(&html).map(|e| element_text(&e)).collect();
        assert_eq!(texts, vec!["1 299 kr".to_string()]);
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(PriceSelector::parse("td:contains('Pris') + td").is_err());
        assert!(PriceSelector::parse("[[[").is_err());
    }

    #[test]
    fn test_compile_steps_skips_bad_entries() {
        let steps = compile_steps(&["[[[", ".price", TEXT_SEARCH_KEYWORD]).unwrap();
        assert_eq!(steps.len(), 2);
        assert!(matches!(steps[1], SelectorStep::TextSearch));

        assert!(matches!(
            compile_steps(&["[[["]),
            Err(ParsingError::NoValidSelectors { .. })
        ));
        assert!(compile_selectors(&[TEXT_SEARCH_KEYWORD]).is_err());
    }
}
