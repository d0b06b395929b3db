//! Stored price history as shown by the `history` command

use anyhow::Result;
use std::fmt;

use crate::domain::constants::monitoring::CURRENCY;
use crate::domain::{PriceHistoryRepository, PriceRecord};

/// What the history file holds, per product or for one product
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryReport {
    /// Latest record of every tracked product
    Products(Vec<PriceRecord>),
    /// Most recent records of one product, oldest first
    Product { name: String, records: Vec<PriceRecord> },
}

impl HistoryReport {
    /// Read the report from `history`.
    ///
    /// `product` selects one product's last `limit` records; `None` lists
    /// every product with its latest price.
    pub async fn collect(
        history: &dyn PriceHistoryRepository,
        product: Option<&str>,
        limit: usize,
    ) -> Result<Self> {
        if let Some(name) = product {
            return Ok(Self::Product {
                name: name.to_string(),
                records: history.history(name, limit).await?,
            });
        }

        let mut latest = Vec::new();
        for name in history.product_names().await? {
            if let Some(record) = history.latest_record(&name).await? {
                latest.push(record);
            }
        }
        Ok(Self::Products(latest))
    }
}

fn flags(record: &PriceRecord) -> &'static str {
    match (record.target_price_reached, record.price_dropped) {
        (true, _) => " 🎯",
        (false, true) => " 📉",
        (false, false) => "",
    }
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Products(records) if records.is_empty() => write!(f, "No price history yet"),
            Self::Products(records) => {
                writeln!(f, "Tracked products: {}", records.len())?;
                for record in records {
                    writeln!(
                        f,
                        "  {}: {} {CURRENCY} ({}){}",
                        record.product_name,
                        record.current_price,
                        record.timestamp.format("%Y-%m-%d %H:%M"),
                        flags(record)
                    )?;
                }
                Ok(())
            }
            Self::Product { name, records } if records.is_empty() => {
                write!(f, "No price history for {name}")
            }
            Self::Product { name, records } => {
                writeln!(f, "Price history: {name}")?;
                for record in records {
                    writeln!(
                        f,
                        "  {}  {} {CURRENCY}{}",
                        record.timestamp.format("%Y-%m-%d %H:%M"),
                        record.current_price,
                        flags(record)
                    )?;
                }
                Ok(())
            }
        }
    }
}
