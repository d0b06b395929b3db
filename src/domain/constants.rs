//! 사이트 특성 및 도메인 상수들
//!
//! Price plausibility bounds, default selectors and text-search keywords for
//! the two supported sites (Prisjakt single-item pages, Blocket listing
//! searches).

/// 가격 범위 상수들
pub mod price_bounds {
    /// Lower bound for prices read from a structural selector
    pub const SELECTOR_MIN: f64 = 0.0;

    /// Upper sanity bound for prices read from a structural selector
    pub const SELECTOR_MAX: f64 = 10_000_000.0;

    /// Lower bound for prices found by free-text patterns.
    ///
    /// Keeps page numbers, item counts and similar small numbers out.
    pub const TEXT_PATTERN_MIN: f64 = 100.0;

    /// Upper bound for prices found by free-text patterns
    pub const TEXT_PATTERN_MAX: f64 = 100_000.0;

    /// Listing pages use the narrow range for selector hits too
    pub const LISTING_MIN: f64 = TEXT_PATTERN_MIN;

    /// See [`LISTING_MIN`]
    pub const LISTING_MAX: f64 = TEXT_PATTERN_MAX;

    /// Text-pattern hits at or above this value are preferred over smaller ones
    pub const PREFERRED_TEXT_PRICE_FLOOR: f64 = 1000.0;
}

/// Selector keywords and defaults
pub mod selectors {
    /// Pseudo-selector meaning "search the whole page text for kronor amounts"
    pub const TEXT_SEARCH_KEYWORD: &str = "text_search_kr";

    /// Default price selector for Prisjakt product pages
    pub const DEFAULT_PRODUCT_PRICE_SELECTOR: &str = ".price-large";

    /// Fallback selectors tried, in order, when the configured selector misses.
    ///
    /// The list ends with [`TEXT_SEARCH_KEYWORD`].
    pub const PRODUCT_PAGE_FALLBACKS: &[&str] = &[
        "span:contains('kr')",
        ".price-box .price",
        ".lowest-price",
        "strong:contains('kr')",
        ".price",
        "[data-testid*='price']",
        ".price-value",
        ".current-price",
        ".product-price",
        TEXT_SEARCH_KEYWORD,
    ];

    /// Price selectors for Blocket search result pages. Every selector is
    /// applied; hits are pooled.
    pub const LISTING_PRICE_SELECTORS: &[&str] = &[
        ".item-price",
        ".search-item__price",
        ".price-container",
        "[data-testid=\"price\"]",
        ".amount",
        ".price",
        ".listing-price",
        ".ad-price",
        "[class*=\"price\"]",
        "[class*=\"Price\"]",
        ".SearchItem-price",
        ".listitem-price",
        ".price-value",
        ".ad-item-price",
    ];

    /// Selectors offered by the `probe` command when none are given
    pub const PROBE_DEFAULTS: &[&str] = &[
        ".price-large",
        ".price",
        ".current-price",
        ".product-price",
        "[data-testid*='price']",
        ".price-value",
    ];
}

/// 모니터링 관련 상수들
pub mod monitoring {
    /// Stored observations kept per product
    pub const HISTORY_RETENTION: usize = 100;

    /// Max characters of element text shown by the selector probe
    pub const PROBE_SAMPLE_CHARS: usize = 100;

    /// Currency shown in notifications and logs
    pub const CURRENCY: &str = "SEK";
}
