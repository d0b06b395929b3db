use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use pricewatch_lib::application::{HistoryReport, PriceMonitor, run_scheduled};
use pricewatch_lib::infrastructure::{
    AppConfig, HttpClient, HttpClientConfig, JsonPriceHistoryRepository, NotificationMessage,
    Notifier, build_notifier, init_logging_with_config,
};

/// Pricewatch - price monitor for Prisjakt and Blocket
#[derive(Parser, Debug)]
#[command(name = "pricewatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ./pricewatch.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override: error, warn, info, debug, trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one monitoring cycle and exit
    Once,

    /// Run a cycle now and then on the configured schedule (default)
    Run,

    /// Show what each selector finds on a page
    Probe {
        /// Page to fetch
        url: String,

        /// Selectors to try; common price selectors when omitted
        selectors: Vec<String>,
    },

    /// Show stored prices; every product's latest when no name is given
    History {
        /// Product name as in the targets file
        name: Option<String>,

        /// Number of records to show for one product
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Send a test notification through the configured method
    TestNotification,
}

fn build_notifier_arc(config: &AppConfig) -> Result<Arc<dyn Notifier>> {
    let notifier = build_notifier(&config.notification).context("Failed to set up notifications")?;
    Ok(Arc::from(notifier))
}

fn build_history(config: &AppConfig) -> JsonPriceHistoryRepository {
    JsonPriceHistoryRepository::new(&config.monitor.history_file, config.monitor.history_retention)
}

fn build_monitor(config: &AppConfig) -> Result<PriceMonitor> {
    let http = HttpClient::with_config(HttpClientConfig::from_scraper_config(&config.scraper))
        .context("Failed to create HTTP client")?;

    Ok(PriceMonitor::new(
        Arc::new(http),
        Arc::new(build_history(config)),
        build_notifier_arc(config)?,
        &config.monitor.targets_file,
    )
    .with_pause(Duration::from_millis(config.scraper.pause_between_targets_ms)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging_with_config(&config.logging)?;
    info!("Pricewatch v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Once => {
            let mut monitor = build_monitor(&config)?;
            let summary = monitor.run_cycle().await?;
            println!("{summary}");
        }
        Commands::Run => {
            let mut monitor = build_monitor(&config)?;
            let every = Duration::from_secs(config.monitor.schedule_interval_hours * 3600);
            run_scheduled(&mut monitor, every, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await;
        }
        Commands::Probe { url, selectors } => {
            let monitor = build_monitor(&config)?;
            let report = monitor.probe_selectors(&url, &selectors).await?;
            println!("{report}");
        }
        Commands::History { name, limit } => {
            let history = build_history(&config);
            let report = HistoryReport::collect(&history, name.as_deref(), limit)
                .await
                .with_context(|| format!("Failed to read {}", history.path().display()))?;
            println!("{report}");
        }
        Commands::TestNotification => {
            let notifier = build_notifier_arc(&config)?;
            notifier
                .send(&NotificationMessage::test())
                .await
                .with_context(|| format!("Test notification via {} failed", notifier.name()))?;
            println!("✅ Test notification sent via {}", notifier.name());
        }
    }

    Ok(())
}
