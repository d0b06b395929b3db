//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML/JSON file, then `PRICEWATCH_*` environment variables
//! (`PRICEWATCH_SCRAPER__MAX_RETRIES=5`). A `.env` file is read first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub monitor: MonitorConfig,
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
}

/// Page fetching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// User agent string sent with every request
    pub user_agent: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Fetch attempts per page, including the first one
    pub max_retries: u32,

    /// Fixed delay between fetch attempts, in seconds
    pub retry_delay_seconds: u64,

    /// Pause between two targets of one cycle, in milliseconds
    pub pause_between_targets_ms: u64,

    pub follow_redirects: bool,
}

/// Monitoring cycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// JSON array of target definitions
    pub targets_file: PathBuf,

    /// JSON price history store
    pub history_file: PathBuf,

    /// Hours between two scheduled cycles
    pub schedule_interval_hours: u64,

    /// Records kept per product
    pub history_retention: usize,
}

/// How alerts are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum NotificationMethod {
    #[default]
    Log,
    Pushbullet,
}

impl fmt::Display for NotificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Pushbullet => write!(f, "pushbullet"),
        }
    }
}

impl FromStr for NotificationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" | "none" => Ok(Self::Log),
            "pushbullet" => Ok(Self::Pushbullet),
            other => Err(ConfigError::Validation {
                message: format!("unknown notification method '{other}'"),
            }),
        }
    }
}

impl TryFrom<String> for NotificationMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub method: NotificationMethod,

    /// Access token for the Pushbullet API
    pub pushbullet_api_key: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs (file output only)
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; `None` means `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,

    /// Module-specific log level filters (e.g., "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            retry_delay_seconds: defaults::RETRY_DELAY_SECONDS,
            pause_between_targets_ms: defaults::PAUSE_BETWEEN_TARGETS_MS,
            follow_redirects: true,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets_file: PathBuf::from(defaults::TARGETS_FILE),
            history_file: PathBuf::from(defaults::HISTORY_FILE),
            schedule_interval_hours: defaults::SCHEDULE_INTERVAL_HOURS,
            history_retention: defaults::HISTORY_RETENTION,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
            module_filters: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `pricewatch.toml` when present.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {:?}", env_file);
        }

        let file = path.map_or_else(|| PathBuf::from(defaults::CONFIG_FILE), Path::to_path_buf);
        let settings = config::Config::builder()
            .add_source(config::File::from(file.as_path()).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!("Configuration loaded (file: {})", file.display());
        Ok(config)
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.request_timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "scraper.request_timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.scraper.max_retries == 0 {
            return Err(ConfigError::Validation {
                message: "scraper.max_retries must be greater than 0".to_string(),
            });
        }

        if self.monitor.schedule_interval_hours == 0 {
            return Err(ConfigError::Validation {
                message: "monitor.schedule_interval_hours must be greater than 0".to_string(),
            });
        }

        if self.monitor.history_retention == 0 {
            return Err(ConfigError::Validation {
                message: "monitor.history_retention must be greater than 0".to_string(),
            });
        }

        if self.notification.method == NotificationMethod::Pushbullet
            && self
                .notification
                .pushbullet_api_key
                .as_deref()
                .is_none_or(|key| key.trim().is_empty())
        {
            return Err(ConfigError::Validation {
                message: "notification.pushbullet_api_key is required for the pushbullet method"
                    .to_string(),
            });
        }

        if !self.logging.console_output && !self.logging.file_output {
            return Err(ConfigError::Validation {
                message: "at least one of logging.console_output or logging.file_output must be enabled"
                    .to_string(),
            });
        }

        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    /// Config file looked up in the working directory
    pub const CONFIG_FILE: &str = "pricewatch.toml";

    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "PRICEWATCH";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default fetch attempts per page
    pub const MAX_RETRIES: u32 = 3;

    /// Default delay between fetch attempts in seconds
    pub const RETRY_DELAY_SECONDS: u64 = 5;

    /// Default pause between targets in milliseconds
    pub const PAUSE_BETWEEN_TARGETS_MS: u64 = 2000;

    pub const TARGETS_FILE: &str = "products.json";

    pub const HISTORY_FILE: &str = "price_history.json";

    /// Default hours between scheduled cycles
    pub const SCHEDULE_INTERVAL_HOURS: u64 = 24;

    pub const HISTORY_RETENTION: usize = crate::domain::constants::monitoring::HISTORY_RETENTION;

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;

    /// Default auto cleanup logs setting
    pub const LOG_AUTO_CLEANUP: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scraper.max_retries, 3);
        assert_eq!(config.monitor.history_retention, 100);
        assert_eq!(config.notification.method, NotificationMethod::Log);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [scraper]
            max_retries = 5

            [monitor]
            targets_file = "watch.json"
            "#,
        );
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.scraper.max_retries, 5);
        assert_eq!(config.scraper.request_timeout_seconds, defaults::REQUEST_TIMEOUT_SECONDS);
        assert_eq!(config.monitor.targets_file, PathBuf::from("watch.json"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let file = write_config("[scraper]\nmax_retries = 0\n");
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_pushbullet_requires_key() {
        let mut config = AppConfig::default();
        config.notification.method = NotificationMethod::Pushbullet;
        assert!(config.validate().is_err());

        config.notification.pushbullet_api_key = Some("o.abc123".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_notification_method_from_str() {
        assert_eq!("Pushbullet".parse::<NotificationMethod>().unwrap(), NotificationMethod::Pushbullet);
        assert_eq!("none".parse::<NotificationMethod>().unwrap(), NotificationMethod::Log);
        assert!("sms".parse::<NotificationMethod>().is_err());
    }

    #[test]
    fn test_notification_method_in_file() {
        let file = write_config("[notification]\nmethod = \"none\"\n");
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.notification.method, NotificationMethod::Log);

        let file = write_config("[notification]\nmethod = \"sms\"\n");
        assert!(AppConfig::load(Some(file.path())).is_err());
    }
}
