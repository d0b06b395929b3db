//! Price alert delivery
//!
//! A [`Notifier`] sends a formatted [`NotificationMessage`]. The log notifier
//! only writes the alert to the log; the Pushbullet notifier posts a link push
//! to the Pushbullet API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::PriceRecord;
use crate::domain::constants::monitoring::CURRENCY;
use crate::infrastructure::config::{NotificationConfig, NotificationMethod};

const PUSHBULLET_ENDPOINT: &str = "https://api.pushbullet.com/v2/pushes";

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Pushbullet API key is not configured")]
    MissingApiKey,

    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Title, body and link of one alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub url: String,
}

impl NotificationMessage {
    /// Message sent by the `test-notification` command
    pub fn test() -> Self {
        Self {
            title: "Pricewatch test".to_string(),
            body: "This is a test notification from pricewatch.".to_string(),
            url: "https://www.prisjakt.nu".to_string(),
        }
    }
}

/// Whole kronor without decimals, anything else with two
fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Build the alert for an observation
pub fn format_message(record: &PriceRecord) -> NotificationMessage {
    let mut lines = vec![format!(
        "Current price: {} {CURRENCY}",
        format_amount(record.current_price)
    )];

    if let Some(previous) = record.previous_price {
        let change = record.current_price - previous;
        let symbol = if change < 0.0 { "📉" } else { "📈" };
        lines.push(format!(
            "Previous price: {} {CURRENCY} ({symbol} {change:+.2} {CURRENCY})",
            format_amount(previous)
        ));
    }

    if record.target_price_reached {
        lines.push("🎯 TARGET PRICE REACHED!".to_string());
    } else if record.price_dropped {
        lines.push("💰 Price dropped!".to_string());
    }

    lines.push(format!("Updated: {} UTC", record.timestamp.format("%Y-%m-%d %H:%M")));
    lines.push(record.url.clone());

    NotificationMessage {
        title: format!("Price Update: {}", record.product_name),
        body: lines.join("\n"),
        url: record.url.clone(),
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError>;

    async fn notify_price(&self, record: &PriceRecord) -> Result<(), NotificationError> {
        self.send(&format_message(record)).await
    }
}

/// Writes alerts to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        info!("🔔 {}\n{}", message.title, message.body);
        Ok(())
    }
}

/// Pushes alerts through the Pushbullet API
#[derive(Debug, Clone)]
pub struct PushbulletNotifier {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl PushbulletNotifier {
    pub fn new(api_key: impl Into<String>) -> Result<Self, NotificationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(NotificationError::MissingApiKey);
        }
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: PUSHBULLET_ENDPOINT.to_string(),
        })
    }

    /// Post to another endpoint (used against local test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    fn name(&self) -> &'static str {
        "pushbullet"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Access-Token", &self.api_key)
            .json(&json!({
                "type": "link",
                "title": message.title,
                "body": message.body,
                "url": message.url,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Pushbullet rejected notification: {}", status);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Push notification sent: {}", message.title);
        Ok(())
    }
}

/// Notifier for the configured delivery method
pub fn build_notifier(config: &NotificationConfig) -> Result<Box<dyn Notifier>, NotificationError> {
    match config.method {
        NotificationMethod::Log => Ok(Box::new(LogNotifier)),
        NotificationMethod::Pushbullet => {
            let key = config
                .pushbullet_api_key
                .clone()
                .ok_or(NotificationError::MissingApiKey)?;
            Ok(Box::new(PushbulletNotifier::new(key)?))
        }
    }
}
