//! Periodic cycles
//!
//! The first cycle runs immediately, then one per interval until the shutdown
//! future completes.

use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::application::price_monitor::PriceMonitor;

/// Run cycles every `every` until `shutdown` resolves; returns the number of
/// cycles started. A failed cycle is logged and the schedule continues.
pub async fn run_scheduled<F>(monitor: &mut PriceMonitor, every: Duration, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("⏰ Scheduler started, running every {:?}", every);
    let mut cycles = 0;

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("🛑 Scheduler stopped after {} cycles", cycles);
                return cycles;
            }
            _ = ticker.tick() => {
                cycles += 1;
                match monitor.run_cycle().await {
                    Ok(summary) => info!("Cycle {} done: {}", cycles, summary),
                    Err(e) => error!("Cycle {} failed: {:#}", cycles, e),
                }
            }
        }
    }
}
