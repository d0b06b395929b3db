//! Repository interfaces for price observations
//!
//! Contains trait definitions for data access; implementations live in the
//! infrastructure layer.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::price::PriceRecord;

#[async_trait]
pub trait PriceHistoryRepository: Send + Sync {
    /// Append an observation, trimming the product's history to the retention limit
    async fn save_record(&self, record: &PriceRecord) -> Result<()>;

    /// Most recent observation of a product
    async fn latest_record(&self, product_name: &str) -> Result<Option<PriceRecord>>;

    /// Up to `limit` most recent observations, oldest first
    async fn history(&self, product_name: &str, limit: usize) -> Result<Vec<PriceRecord>>;

    /// Every product with at least one stored observation
    async fn product_names(&self) -> Result<Vec<String>>;
}
