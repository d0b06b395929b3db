//! Loading monitored targets from the targets file
//!
//! The file is a JSON array of target definitions. A malformed file is an
//! error; a malformed or invalid entry only excludes that entry.

use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{MonitoredTarget, TargetDefinition, TargetError};
use crate::infrastructure::parsing::SelectorStep;

#[derive(Error, Debug)]
pub enum TargetLoadError {
    #[error("Failed to read targets file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Targets file is not a JSON array: {0}")]
    Format(#[from] serde_json::Error),
}

/// An entry excluded from the run, with its position in the file
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedTarget {
    pub index: usize,
    pub name: Option<String>,
    pub error: TargetError,
}

/// Valid targets plus the entries that were rejected
#[derive(Debug, Clone, Default)]
pub struct LoadedTargets {
    pub targets: Vec<MonitoredTarget>,
    pub rejected: Vec<RejectedTarget>,
}

/// Validate one definition, including that its selector override compiles
fn validate(definition: TargetDefinition) -> Result<MonitoredTarget, TargetError> {
    let target = MonitoredTarget::try_from(definition)?;
    if let Some(selector) = &target.price_selector {
        SelectorStep::parse(selector).map_err(|e| TargetError::InvalidSelector {
            selector: selector.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(target)
}

/// Parse and validate the contents of a targets file
pub fn parse_targets(json: &str) -> Result<LoadedTargets, TargetLoadError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut loaded = LoadedTargets::default();

    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry.get("name").and_then(|v| v.as_str()).map(str::to_string);

        let result = serde_json::from_value::<TargetDefinition>(entry)
            .map_err(|e| TargetError::Malformed {
                reason: e.to_string(),
            })
            .and_then(validate);

        match result {
            Ok(target) => loaded.targets.push(target),
            Err(error) => {
                warn!(
                    "❌ Rejected target #{} ({}): {}",
                    index,
                    name.as_deref().unwrap_or("unnamed"),
                    error
                );
                loaded.rejected.push(RejectedTarget { index, name, error });
            }
        }
    }

    Ok(loaded)
}

/// Read, parse and validate the targets file
pub async fn load_targets(path: &Path) -> Result<LoadedTargets, TargetLoadError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TargetLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;

    let loaded = parse_targets(&json)?;
    info!(
        "Loaded {} targets from {} ({} rejected)",
        loaded.targets.len(),
        path.display(),
        loaded.rejected.len()
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Platform;
    use tokio_test::{assert_err, assert_ok};

    const TARGETS: &str = r#"[
        {
            "name": "Sony WH-1000XM5",
            "url": "https://www.prisjakt.nu/produkt.php?p=5963",
            "target_price": 2999
        },
        {
            "name": "Begagnad soffa",
            "url": "https://www.blocket.se/annonser/hela_sverige?q=soffa",
            "platform": "blocket",
            "min_price": 900,
            "max_price": 2000
        },
        {
            "name": "Broken selector",
            "url": "https://www.prisjakt.nu/produkt.php?p=1",
            "price_selector": "div[[["
        },
        {
            "name": "Unknown site",
            "url": "https://www.tradera.com/item/1",
            "platform": "tradera"
        },
        { "name": "No URL" }
    ]"#;

    #[test]
    fn test_valid_and_rejected_entries() {
        let loaded = parse_targets(TARGETS).unwrap();

        assert_eq!(loaded.targets.len(), 2);
        assert_eq!(loaded.targets[1].platform, Platform::Blocket);
        assert_eq!(loaded.targets[1].filter.min, Some(900.0));

        let rejected: Vec<usize> = loaded.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![2, 3, 4]);
        assert!(matches!(loaded.rejected[0].error, TargetError::InvalidSelector { .. }));
        assert!(matches!(loaded.rejected[1].error, TargetError::UnknownPlatform { .. }));
        assert!(matches!(loaded.rejected[2].error, TargetError::Malformed { .. }));
        assert_eq!(loaded.rejected[2].name.as_deref(), Some("No URL"));
    }

    #[test]
    fn test_text_search_keyword_is_a_valid_override() {
        let json = r#"[{"name": "Kamera", "url": "https://www.prisjakt.nu/produkt.php?p=2", "price_selector": "text_search_kr"}]"#;
        let loaded = parse_targets(json).unwrap();
        assert!(loaded.rejected.is_empty());
        assert_eq!(loaded.targets[0].price_selector.as_deref(), Some("text_search_kr"));
    }

    #[test]
    fn test_not_an_array_is_an_error() {
        assert!(matches!(
            parse_targets(r#"{"name": "x"}"#),
            Err(TargetLoadError::Format(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        tokio::fs::write(&path, TARGETS).await.unwrap();

        let loaded = assert_ok!(load_targets(&path).await);
        assert_eq!(loaded.targets.len(), 2);

        let missing = assert_err!(load_targets(&dir.path().join("nope.json")).await);
        assert!(matches!(missing, TargetLoadError::Io { .. }));
    }
}
