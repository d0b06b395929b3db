//! Infrastructure layer: HTML price extraction, HTTP transport, storage,
//! notifications, configuration and logging.

pub mod config;
pub mod logging;
pub mod notification;
pub mod parsing;
pub mod parsing_error;
pub mod price_history_repository;
pub mod simple_http_client;
pub mod target_loader;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, LoggingConfig, NotificationMethod};
pub use logging::{get_log_directory, init_logging_with_config};
pub use notification::{
    LogNotifier, NotificationError, NotificationMessage, Notifier, PushbulletNotifier,
    build_notifier, format_message,
};
pub use parsing::{
    ContextualParser, ListingParser, ParseContext, ParsingError, ParsingResult, ProductPageParser,
};
pub use price_history_repository::{JsonPriceHistoryRepository, StorageError};
pub use simple_http_client::{HttpClient, HttpClientConfig, PageFetcher, TransportError};
pub use target_loader::{LoadedTargets, RejectedTarget, TargetLoadError, load_targets, parse_targets};
