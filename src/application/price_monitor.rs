//! Monitoring cycle
//!
//! For every target: fetch, extract, compare with the stored history, store,
//! and notify when warranted. One target's failure never stops the others.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scraper::Html;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::application::platform_dispatcher::PlatformDispatcher;
use crate::domain::constants::monitoring::{CURRENCY, PROBE_SAMPLE_CHARS};
use crate::domain::constants::selectors::PROBE_DEFAULTS;
use crate::domain::{
    ExtractionOutcome, ExtractionSource, MonitoredTarget, NotifyReason, PriceHistoryRepository,
    PriceRange, PriceRecord,
};
use crate::infrastructure::notification::Notifier;
use crate::infrastructure::parsing::PriceSelector;
use crate::infrastructure::parsing::selector_extractor::{element_count, first_price, sample_text};
use crate::infrastructure::parsing::text_pattern_extractor::{TextPatternExtractor, page_text};
use crate::infrastructure::simple_http_client::PageFetcher;
use crate::infrastructure::target_loader::{LoadedTargets, load_targets};

/// What happened to one target in one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum TargetStatus {
    Resolved {
        price: f64,
        source: ExtractionSource,
        notify: Option<NotifyReason>,
        notified: bool,
    },
    NoPriceFound,
    OutsideFilterRange {
        found: usize,
        lowest: f64,
        highest: f64,
    },
    TransportFailed {
        error: String,
    },
    /// Parser configuration or storage failure
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub name: String,
    pub status: TargetStatus,
}

/// Counts for one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub checked: usize,
    pub resolved: usize,
    pub notified: usize,
    pub no_price: usize,
    pub outside_range: usize,
    pub transport_failed: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl CycleSummary {
    fn new(rejected: usize) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            checked: 0,
            resolved: 0,
            notified: 0,
            no_price: 0,
            outside_range: 0,
            transport_failed: 0,
            failed: 0,
            rejected,
        }
    }

    fn record(&mut self, status: &TargetStatus) {
        self.checked += 1;
        match status {
            TargetStatus::Resolved { notified, .. } => {
                self.resolved += 1;
                if *notified {
                    self.notified += 1;
                }
            }
            TargetStatus::NoPriceFound => self.no_price += 1,
            TargetStatus::OutsideFilterRange { .. } => self.outside_range += 1,
            TargetStatus::TransportFailed { .. } => self.transport_failed += 1,
            TargetStatus::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked {}, resolved {}, notified {}, no price {}, outside range {}, fetch failed {}, failed {}, rejected {}",
            self.checked,
            self.resolved,
            self.notified,
            self.no_price,
            self.outside_range,
            self.transport_failed,
            self.failed,
            self.rejected
        )
    }
}

/// One selector's result in a probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRow {
    pub selector: String,
    pub price: Option<f64>,
    pub matches: usize,
    pub sample: Option<String>,
    pub error: Option<String>,
}

/// Selector probe of one page
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub url: String,
    pub rows: Vec<ProbeRow>,
    pub text_search: Option<f64>,
}

impl ProbeReport {
    /// Evaluate `selectors` against an already fetched page
    pub fn from_html(url: &str, html: &str, selectors: &[String]) -> Self {
        let document = Html::parse_document(html);
        let rows = selectors
            .iter()
            .map(|raw| match PriceSelector::parse(raw) {
                Ok(selector) => ProbeRow {
                    selector: raw.clone(),
                    price: first_price(&document, &selector, PriceRange::selector()),
                    matches: element_count(&document, &selector),
                    sample: sample_text(&document, &selector, PROBE_SAMPLE_CHARS),
                    error: None,
                },
                Err(e) => ProbeRow {
                    selector: raw.clone(),
                    price: None,
                    matches: 0,
                    sample: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        let text_search = TextPatternExtractor::product_page().best_price(&page_text(&document));

        Self {
            url: url.to_string(),
            rows,
            text_search,
        }
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Selector probe: {}", self.url)?;
        for row in &self.rows {
            match (&row.error, row.price) {
                (Some(error), _) => writeln!(f, "  ❌ {}: {}", row.selector, error)?,
                (None, Some(price)) => writeln!(
                    f,
                    "  ✅ {}: {} {} ({} matches)",
                    row.selector, price, CURRENCY, row.matches
                )?,
                (None, None) => writeln!(f, "  ➖ {}: no price ({} matches)", row.selector, row.matches)?,
            }
            if let Some(sample) = &row.sample {
                writeln!(f, "     sample: {sample}")?;
            }
        }
        match self.text_search {
            Some(price) => write!(f, "  🔎 text search: {price} {CURRENCY}"),
            None => write!(f, "  🔎 text search: no price"),
        }
    }
}

/// Runs monitoring cycles over the configured targets
pub struct PriceMonitor {
    fetcher: Arc<dyn PageFetcher>,
    history: Arc<dyn PriceHistoryRepository>,
    notifier: Arc<dyn Notifier>,
    dispatcher: PlatformDispatcher,
    targets_file: PathBuf,
    pause_between_targets: Duration,
}

impl PriceMonitor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        history: Arc<dyn PriceHistoryRepository>,
        notifier: Arc<dyn Notifier>,
        targets_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            history,
            notifier,
            dispatcher: PlatformDispatcher::new(),
            targets_file: targets_file.into(),
            pause_between_targets: Duration::ZERO,
        }
    }

    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_between_targets = pause;
        self
    }

    /// Load the targets file and check every valid target
    pub async fn run_cycle(&mut self) -> Result<CycleSummary> {
        let loaded = load_targets(&self.targets_file)
            .await
            .with_context(|| format!("Failed to load targets from {}", self.targets_file.display()))?;
        Ok(self.run_targets(&loaded).await)
    }

    /// Check already loaded targets
    pub async fn run_targets(&mut self, loaded: &LoadedTargets) -> CycleSummary {
        let mut summary = CycleSummary::new(loaded.rejected.len());
        let span = info_span!("cycle", id = %summary.cycle_id);

        async {
            info!("🚀 Starting price check for {} targets", loaded.targets.len());

            for (i, target) in loaded.targets.iter().enumerate() {
                if i > 0 && !self.pause_between_targets.is_zero() {
                    tokio::time::sleep(self.pause_between_targets).await;
                }
                let report = self.check_target(target).await;
                summary.record(&report.status);
            }

            info!("✅ Cycle finished: {}", summary);
        }
        .instrument(span)
        .await;

        summary
    }

    /// Fetch, extract, store and notify for one target
    pub async fn check_target(&mut self, target: &MonitoredTarget) -> TargetReport {
        let status = self
            .check_target_inner(target)
            .instrument(info_span!("target", name = %target.name, platform = %target.platform))
            .await;
        TargetReport {
            name: target.name.clone(),
            status,
        }
    }

    async fn check_target_inner(&mut self, target: &MonitoredTarget) -> TargetStatus {
        let html = match self.fetcher.fetch_page(target.url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                error!("Fetch failed: {}", e);
                return TargetStatus::TransportFailed { error: e.to_string() };
            }
        };

        // The parsed document stays inside this synchronous call
        let outcome = match self.dispatcher.extract(target, &html) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Extractor configuration error: {}", e);
                return TargetStatus::Failed { error: e.to_string() };
            }
        };

        let candidate = match outcome {
            ExtractionOutcome::Resolved(candidate) => candidate,
            ExtractionOutcome::NoPriceFound => {
                warn!("Could not extract price");
                return TargetStatus::NoPriceFound;
            }
            ExtractionOutcome::OutsideFilterRange { found, lowest, highest } => {
                info!("{} prices found, none in range ({}..{})", found, lowest, highest);
                return TargetStatus::OutsideFilterRange { found, lowest, highest };
            }
        };

        match self.record_observation(target, candidate.value).await {
            Ok((notify, notified)) => TargetStatus::Resolved {
                price: candidate.value,
                source: candidate.source,
                notify,
                notified,
            },
            Err(e) => {
                error!("Failed to store observation: {:#}", e);
                TargetStatus::Failed { error: format!("{e:#}") }
            }
        }
    }

    /// Compare with the latest record, store, and notify if warranted
    async fn record_observation(
        &self,
        target: &MonitoredTarget,
        price: f64,
    ) -> Result<(Option<NotifyReason>, bool)> {
        let previous = self.history.latest_record(&target.name).await?;
        let mut record = PriceRecord::new(target, price, Utc::now());
        let notify = record.compare_with(previous.as_ref());

        info!("💰 Current price: {} {}", price, CURRENCY);
        if let Some(amount) = record.drop_amount() {
            info!("📉 Price dropped by {} {}", amount, CURRENCY);
        }

        self.history.save_record(&record).await?;

        let Some(reason) = notify else {
            return Ok((None, false));
        };

        info!("🔔 Notifying ({:?})", reason);
        let notified = match self.notifier.notify_price(&record).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Notification via {} failed: {}", self.notifier.name(), e);
                false
            }
        };
        Ok((Some(reason), notified))
    }

    /// Report what each selector finds on `url`.
    ///
    /// An empty selector list probes the common defaults.
    pub async fn probe_selectors(&self, url: &str, selectors: &[String]) -> Result<ProbeReport> {
        let html = self
            .fetcher
            .fetch_page(url)
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        let selectors: Vec<String> = if selectors.is_empty() {
            PROBE_DEFAULTS.iter().map(ToString::to_string).collect()
        } else {
            selectors.to_vec()
        };

        Ok(ProbeReport::from_html(url, &html, &selectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <h1>Kamera</h1>
        <div class="price-large">4 990 kr</div>
        <div class="price">Fri frakt</div>
        <p>Tidigare 5 490 kr</p>
    "#;

    #[test]
    fn test_probe_report_rows() {
        let selectors = vec![
            ".price-large".to_string(),
            ".price".to_string(),
            "div[[[".to_string(),
        ];
        let report = ProbeReport::from_html("https://example.se", PAGE, &selectors);

        assert_eq!(report.rows[0].price, Some(4990.0));
        assert_eq!(report.rows[0].matches, 1);
        assert_eq!(report.rows[0].sample.as_deref(), Some("4 990 kr"));

        assert_eq!(report.rows[1].price, None);
        assert_eq!(report.rows[1].matches, 1);

        assert!(report.rows[2].error.is_some());
        assert_eq!(report.text_search, Some(5490.0));

        let printed = report.to_string();
        assert!(printed.contains("✅ .price-large: 4990 SEK"));
        assert!(printed.contains("🔎 text search: 5490 SEK"));
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = CycleSummary::new(2);
        summary.record(&TargetStatus::NoPriceFound);
        summary.record(&TargetStatus::TransportFailed {
            error: "timeout".to_string(),
        });
        summary.record(&TargetStatus::Resolved {
            price: 100.0,
            source: ExtractionSource::TextPattern,
            notify: Some(NotifyReason::FirstObservation),
            notified: true,
        });

        assert_eq!(summary.checked, 3);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.notified, 1);
        assert_eq!(summary.no_price, 1);
        assert_eq!(summary.transport_failed, 1);
        assert_eq!(summary.rejected, 2);
    }
}
