//! JSON file implementation of the price history repository
//!
//! The file holds one object mapping product name to its observations, oldest
//! first. Writes go through a temporary file and a rename.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{PriceHistoryRepository, PriceRecord};

type HistoryMap = BTreeMap<String, Vec<PriceRecord>>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access price history {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Price history {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize price history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Price history stored in a single JSON file
#[derive(Debug)]
pub struct JsonPriceHistoryRepository {
    path: PathBuf,
    retention: usize,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonPriceHistoryRepository {
    pub fn new(path: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            path: path.into(),
            retention: retention.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty history
    async fn load(&self) -> Result<HistoryMap, StorageError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HistoryMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(HistoryMap::new());
        }

        serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn store(&self, data: &HistoryMap) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(io_error)?;
        fs::rename(&tmp, &self.path).await.map_err(io_error)?;
        Ok(())
    }
}

#[async_trait]
impl PriceHistoryRepository for JsonPriceHistoryRepository {
    async fn save_record(&self, record: &PriceRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.load().await?;

        let records = data.entry(record.product_name.clone()).or_default();
        records.push(record.clone());
        if records.len() > self.retention {
            let excess = records.len() - self.retention;
            records.drain(..excess);
            debug!("Trimmed {} old records for {}", excess, record.product_name);
        }

        self.store(&data).await?;
        info!("💾 Saved price record for {}", record.product_name);
        Ok(())
    }

    async fn latest_record(&self, product_name: &str) -> Result<Option<PriceRecord>> {
        let mut data = self.load().await?;
        Ok(data.remove(product_name).and_then(|mut records| records.pop()))
    }

    async fn history(&self, product_name: &str, limit: usize) -> Result<Vec<PriceRecord>> {
        let mut data = self.load().await?;
        let mut records = data.remove(product_name).unwrap_or_default();
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
        Ok(records)
    }

    async fn product_names(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn record(name: &str, price: f64, minute: i64) -> PriceRecord {
        PriceRecord {
            product_name: name.to_string(),
            current_price: price,
            previous_price: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minute),
            url: "https://www.prisjakt.nu/produkt.php?p=1".to_string(),
            price_dropped: false,
            target_price_reached: false,
        }
    }

    fn repository(dir: &TempDir, retention: usize) -> JsonPriceHistoryRepository {
        JsonPriceHistoryRepository::new(dir.path().join("history.json"), retention)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir, 100);
        assert!(repo.latest_record("Kamera").await.unwrap().is_none());
        assert!(repo.product_names().await.unwrap().is_empty());
        assert!(repo.history("Kamera", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir, 100);

        assert_ok!(repo.save_record(&record("Kamera", 4990.0, 0)).await);
        assert_ok!(repo.save_record(&record("Kamera", 4490.0, 1)).await);
        assert_ok!(repo.save_record(&record("Soffa", 2500.0, 2)).await);

        let latest = assert_ok!(repo.latest_record("Kamera").await).unwrap();
        assert_eq!(latest.current_price, 4490.0);
        assert_eq!(assert_ok!(repo.product_names().await), vec!["Kamera", "Soffa"]);

        // A fresh handle reads the same file
        let reopened = repository(&dir, 100);
        assert_eq!(reopened.history("Kamera", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retention_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir, 3);
        for i in 0..5 {
            repo.save_record(&record("Kamera", 1000.0 + f64::from(i), i64::from(i))).await.unwrap();
        }

        let history = repo.history("Kamera", 10).await.unwrap();
        let prices: Vec<f64> = history.iter().map(|r| r.current_price).collect();
        assert_eq!(prices, vec![1002.0, 1003.0, 1004.0]);
    }

    #[tokio::test]
    async fn test_history_limit_returns_most_recent() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir, 100);
        for i in 0..4 {
            repo.save_record(&record("Kamera", 1000.0 + f64::from(i), i64::from(i))).await.unwrap();
        }

        let history = repo.history("Kamera", 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].current_price, 1003.0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir, 100);
        tokio::fs::write(repo.path(), "{not json").await.unwrap();

        let err = assert_err!(repo.latest_record("Kamera").await);
        assert!(matches!(err.downcast_ref::<StorageError>(), Some(StorageError::Corrupt { .. })));
        assert_err!(repo.save_record(&record("Kamera", 4990.0, 0)).await);
    }
}
