//! Monitored targets and the sites they live on

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Validation failures for a target definition. Each one excludes the target
/// from the run; none of them is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetError {
    #[error("Malformed target entry: {reason}")]
    Malformed { reason: String },

    #[error("Target name cannot be empty")]
    EmptyName,

    #[error("Unsupported platform '{value}' (expected one of: prisjakt, blocket)")]
    UnknownPlatform { value: String },

    #[error("Invalid target URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid target price {value}")]
    InvalidTargetPrice { value: f64 },

    #[error("Invalid price filter: min={min:?} max={max:?}")]
    InvalidPriceFilter { min: Option<f64>, max: Option<f64> },

    #[error("Invalid price selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Supported sites. Adding a site means adding parsing rules, so this stays a
/// closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Prisjakt.nu product pages: one item, one price
    Prisjakt,
    /// Blocket.se search results: many items, best price wins
    Blocket,
}

impl Platform {
    pub const ALL: [Self; 2] = [Self::Prisjakt, Self::Blocket];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prisjakt => "prisjakt",
            Self::Blocket => "blocket",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prisjakt" => Ok(Self::Prisjakt),
            "blocket" => Ok(Self::Blocket),
            _ => Err(TargetError::UnknownPlatform {
                value: s.to_string(),
            }),
        }
    }
}

fn default_platform() -> String {
    Platform::Prisjakt.as_str().to_string()
}

/// Target record as written in the targets file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDefinition {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub price_selector: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

/// Optional min/max bounds applied to listing prices
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceFilter {
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Inclusive on both ends; a missing bound does not constrain
    pub fn contains(&self, price: f64) -> bool {
        if self.min.is_some_and(|min| price < min) {
            return false;
        }
        if self.max.is_some_and(|max| price > max) {
            return false;
        }
        true
    }

    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// A validated target, immutable for the duration of a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredTarget {
    pub name: String,
    pub url: Url,
    pub platform: Platform,
    /// Selector override; `None` means the site default
    pub price_selector: Option<String>,
    pub target_price: Option<f64>,
    pub filter: PriceFilter,
}

impl MonitoredTarget {
    /// Whether `price` meets the configured target
    pub fn target_reached(&self, price: f64) -> bool {
        self.target_price.is_some_and(|target| price <= target)
    }
}

fn validate_bound(value: Option<f64>) -> bool {
    value.is_none_or(|v| v.is_finite() && v >= 0.0)
}

impl TryFrom<TargetDefinition> for MonitoredTarget {
    type Error = TargetError;

    fn try_from(definition: TargetDefinition) -> Result<Self, Self::Error> {
        let name = definition.name.trim().to_string();
        if name.is_empty() {
            return Err(TargetError::EmptyName);
        }

        let platform = definition.platform.parse::<Platform>()?;

        let url = Url::parse(definition.url.trim()).map_err(|e| TargetError::InvalidUrl {
            url: definition.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TargetError::InvalidUrl {
                url: definition.url,
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if let Some(value) = definition.target_price {
            if !value.is_finite() || value < 0.0 {
                return Err(TargetError::InvalidTargetPrice { value });
            }
        }

        let (min, max) = (definition.min_price, definition.max_price);
        let ordered = match (min, max) {
            (Some(lo), Some(hi)) => lo <= hi,
            _ => true,
        };
        if !validate_bound(min) || !validate_bound(max) || !ordered {
            return Err(TargetError::InvalidPriceFilter { min, max });
        }

        let price_selector = definition
            .price_selector
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            name,
            url,
            platform,
            price_selector,
            target_price: definition.target_price,
            filter: PriceFilter::new(min, max),
        })
    }
}
