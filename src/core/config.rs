//! Environment-driven configuration
//!
//! `LoggerConfig::from_env()` resolves every setting once; the Database,
//! HTTP and Webhook transports are enabled by the presence of their URL.

use super::error::{LoggerError, Result};
use super::log_context::LogContext;
use super::log_level::LogLevel;
use super::output_format::ConsoleFormat;
use super::retry::RetryStrategy;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Trade log detail for size: `Minimal` keeps only correlation-critical fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    Minimal,
    #[default]
    Full,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Minimal => "minimal",
            Scope::Full => "full",
        }
    }

    pub fn is_minimal(&self) -> bool {
        matches!(self, Scope::Minimal)
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minimal" | "min" => Ok(Scope::Minimal),
            "full" => Ok(Scope::Full),
            _ => Err(format!("Invalid log scope: '{}'", s)),
        }
    }
}

/// Service identity merged into every entry's default context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl ServiceInfo {
    pub fn is_development(&self) -> bool {
        matches!(self.environment.as_str(), "development" | "dev" | "local")
    }
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            version: "0.0.0".to_string(),
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: ConsoleFormat,
    pub colors: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Standard,
            colors: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    /// Base filename; files are named `<filename>-YYYY-MM-DD.log`
    pub filename: String,
    pub max_size: u64,
    /// `<= 0` disables the retention sweep
    pub retention_days: i64,
    pub compress: bool,
    pub write_timeout: Duration,
    pub retention_interval: Duration,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("logs"),
            filename: "app".to_string(),
            max_size: 10 * 1024 * 1024,
            retention_days: 14,
            compress: false,
            write_timeout: Duration::from_secs(5),
            retention_interval: Duration::from_secs(24 * 3600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub table: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            table: "logs".to_string(),
            batch_size: 100,
            flush_interval: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub timeout: Duration,
    pub retry: RetryStrategy,
}

impl HttpConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            batch_size: 50,
            flush_interval: Duration::from_millis(10_000),
            timeout: Duration::from_millis(5000),
            retry: RetryStrategy::http_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: String,
    pub min_level: LogLevel,
    pub rate_limit: usize,
    pub rate_window: Duration,
    pub timeout: Duration,
    pub retry: RetryStrategy,
}

impl WebhookConfig {
    pub const DEFAULT_RATE_LIMIT: usize = 10;
    pub const MINIMAL_RATE_LIMIT: usize = 5;

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            min_level: LogLevel::Error,
            rate_limit: Self::DEFAULT_RATE_LIMIT,
            rate_window: Duration::from_millis(60_000),
            timeout: Duration::from_millis(5000),
            retry: RetryStrategy::webhook_default(),
        }
    }
}

/// Process-wide logging configuration
///
/// # Example
///
/// ```
/// use log_pipeline::core::LoggerConfig;
/// use std::collections::HashMap;
///
/// let env: HashMap<&str, &str> = [("LOG_LEVEL", "warn"), ("LOG_FILE", "false")].into();
/// let config = LoggerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
/// assert!(!config.file.enabled);
/// assert!(config.database.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub service: ServiceInfo,
    pub scope: Scope,
    pub visual_errors: bool,
    pub console: ConsoleConfig,
    pub file: FileConfig,
    pub database: Option<DatabaseConfig>,
    pub http: Option<HttpConfig>,
    pub webhook: Option<WebhookConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            service: ServiceInfo::default(),
            scope: Scope::Full,
            visual_errors: false,
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
            database: None,
            http: None,
            webhook: None,
        }
    }
}

impl LoggerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = get("APP_ENV")
            .or_else(|| get("RUST_ENV"))
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase();
        let service = ServiceInfo {
            name: get("SERVICE_NAME").unwrap_or_else(|| "app".to_string()),
            version: get("SERVICE_VERSION").unwrap_or_else(|| "0.0.0".to_string()),
            environment,
        };
        let development = service.is_development();

        let level = match get("LOG_LEVEL") {
            Some(raw) => raw
                .parse::<LogLevel>()
                .map_err(|e| LoggerError::config("LOG_LEVEL", e))?,
            None if development => LogLevel::Debug,
            None => LogLevel::Info,
        };

        let scope = match get("LOG_SCOPE") {
            Some(raw) => raw
                .parse::<Scope>()
                .map_err(|e| LoggerError::config("LOG_SCOPE", e))?,
            None => Scope::Full,
        };

        let console = ConsoleConfig {
            enabled: parse_bool(get("LOG_CONSOLE"), "LOG_CONSOLE", true)?,
            format: match get("LOG_FORMAT") {
                Some(raw) => raw
                    .parse::<ConsoleFormat>()
                    .map_err(|e| LoggerError::config("LOG_FORMAT", e))?,
                None if development => ConsoleFormat::Pretty,
                None => ConsoleFormat::Standard,
            },
            colors: parse_bool(
                get("LOG_COLORS"),
                "LOG_COLORS",
                std::io::stdout().is_terminal(),
            )?,
        };

        let file_defaults = FileConfig::default();
        let file = FileConfig {
            enabled: parse_bool(get("LOG_FILE"), "LOG_FILE", true)?,
            directory: get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(file_defaults.directory),
            filename: get("LOG_FILE_NAME").unwrap_or(file_defaults.filename),
            max_size: match get("LOG_MAX_SIZE") {
                Some(raw) => parse_size(&raw).map_err(|e| LoggerError::config("LOG_MAX_SIZE", e))?,
                None => file_defaults.max_size,
            },
            retention_days: parse_num(
                get("LOG_RETENTION_DAYS"),
                "LOG_RETENTION_DAYS",
                file_defaults.retention_days,
            )?,
            compress: parse_bool(get("LOG_COMPRESS"), "LOG_COMPRESS", false)?,
            ..file_defaults
        };

        let database = match get("DATABASE_URL") {
            Some(url) => {
                let defaults = DatabaseConfig::new(url);
                Some(DatabaseConfig {
                    table: get("LOG_DB_TABLE").unwrap_or_else(|| defaults.table.clone()),
                    batch_size: parse_num(
                        get("LOG_DB_BATCH_SIZE"),
                        "LOG_DB_BATCH_SIZE",
                        defaults.batch_size,
                    )?,
                    flush_interval: parse_millis(
                        get("LOG_DB_FLUSH_INTERVAL_MS"),
                        "LOG_DB_FLUSH_INTERVAL_MS",
                        defaults.flush_interval,
                    )?,
                    ..defaults
                })
            }
            None => None,
        };

        let http = match get("LOG_HTTP_URL") {
            Some(url) => {
                let defaults = HttpConfig::new(url);
                Some(HttpConfig {
                    api_key: get("LOG_HTTP_API_KEY"),
                    batch_size: parse_num(
                        get("LOG_HTTP_BATCH_SIZE"),
                        "LOG_HTTP_BATCH_SIZE",
                        defaults.batch_size,
                    )?,
                    flush_interval: parse_millis(
                        get("LOG_HTTP_FLUSH_INTERVAL_MS"),
                        "LOG_HTTP_FLUSH_INTERVAL_MS",
                        defaults.flush_interval,
                    )?,
                    timeout: parse_millis(
                        get("LOG_HTTP_TIMEOUT_MS"),
                        "LOG_HTTP_TIMEOUT_MS",
                        defaults.timeout,
                    )?,
                    ..defaults
                })
            }
            None => None,
        };

        let webhook = match get("LOG_WEBHOOK_URL") {
            Some(url) => {
                let defaults = WebhookConfig::new(url);
                let default_limit = if scope.is_minimal() {
                    WebhookConfig::MINIMAL_RATE_LIMIT
                } else {
                    WebhookConfig::DEFAULT_RATE_LIMIT
                };
                Some(WebhookConfig {
                    min_level: match get("LOG_WEBHOOK_LEVEL") {
                        Some(raw) => raw
                            .parse::<LogLevel>()
                            .map_err(|e| LoggerError::config("LOG_WEBHOOK_LEVEL", e))?,
                        None => defaults.min_level,
                    },
                    rate_limit: parse_num(
                        get("LOG_WEBHOOK_RATE_LIMIT"),
                        "LOG_WEBHOOK_RATE_LIMIT",
                        default_limit,
                    )?,
                    rate_window: parse_millis(
                        get("LOG_WEBHOOK_RATE_WINDOW_MS"),
                        "LOG_WEBHOOK_RATE_WINDOW_MS",
                        defaults.rate_window,
                    )?,
                    ..defaults
                })
            }
            None => None,
        };

        let config = Self {
            level,
            visual_errors: parse_bool(get("LOG_VISUAL_ERRORS"), "LOG_VISUAL_ERRORS", development)?,
            service,
            scope,
            console,
            file,
            database,
            http,
            webhook,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.file.enabled {
            if self.file.filename.trim().is_empty() {
                return Err(LoggerError::config("FileTransport", "file name cannot be empty"));
            }
            if self.file.max_size == 0 {
                return Err(LoggerError::config(
                    "FileTransport",
                    "max size must be greater than 0",
                ));
            }
        }
        if let Some(db) = &self.database {
            if db.batch_size == 0 {
                return Err(LoggerError::config(
                    "DatabaseTransport",
                    "batch size must be greater than 0",
                ));
            }
            if db.table.is_empty()
                || !db
                    .table
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(LoggerError::config(
                    "DatabaseTransport",
                    format!("invalid table name '{}'", db.table),
                ));
            }
        }
        if let Some(http) = &self.http {
            if http.batch_size == 0 {
                return Err(LoggerError::config(
                    "HttpTransport",
                    "batch size must be greater than 0",
                ));
            }
        }
        if let Some(webhook) = &self.webhook {
            if webhook.rate_limit == 0 {
                return Err(LoggerError::config(
                    "WebhookTransport",
                    "rate limit must be greater than 0",
                ));
            }
        }
        Ok(())
    }

    pub fn is_minimal(&self) -> bool {
        self.scope.is_minimal()
    }

    /// Service identity as the default context of the root logger
    pub fn default_context(&self) -> LogContext {
        LogContext::new()
            .with_field("service", self.service.name.as_str())
            .with_field("version", self.service.version.as_str())
            .with_field("environment", self.service.environment.as_str())
    }
}

fn parse_bool(raw: Option<String>, key: &str, default: bool) -> Result<bool> {
    match raw {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(LoggerError::config(key, format!("expected a boolean, got '{}'", v))),
        },
    }
}

fn parse_num<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|_| LoggerError::config(key, format!("expected a number, got '{}'", v))),
    }
}

fn parse_millis(raw: Option<String>, key: &str, default: Duration) -> Result<Duration> {
    match raw {
        None => Ok(default),
        Some(_) => parse_num::<u64>(raw, key, 0).map(Duration::from_millis),
    }
}

/// Parse a byte size such as `1048576`, `512K`, `10MB` or `1GB`
pub fn parse_size(raw: &str) -> std::result::Result<u64, String> {
    let upper = raw.trim().to_uppercase();
    let digits_end = upper
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(upper.len());
    let (number, unit) = upper.split_at(digits_end);
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid size '{}'", raw))?;
    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        other => return Err(format!("unknown size unit '{}'", other)),
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' overflows", raw))
}
