//! Application layer module
//!
//! Orchestrates the monitoring cycle: site dispatch, per-target checks and
//! the periodic schedule. Also renders the stored history.

pub mod history_report;
pub mod platform_dispatcher;
pub mod price_monitor;
pub mod scheduler;

pub use history_report::HistoryReport;
pub use platform_dispatcher::{PlatformDispatcher, SiteExtractor};
pub use price_monitor::{CycleSummary, PriceMonitor, ProbeReport, ProbeRow, TargetReport, TargetStatus};
pub use scheduler::run_scheduled;
