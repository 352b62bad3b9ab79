//! Core logger types and traits

pub mod config;
pub mod error;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod registry;
pub mod retry;
pub mod timestamp;
pub mod transport;

pub use config::{
    parse_size, ConsoleConfig, DatabaseConfig, FileConfig, HttpConfig, LoggerConfig, Scope,
    ServiceInfo, WebhookConfig,
};
pub use error::{LoggerError, Result};
pub use log_context::{FieldValue, LogContext};
pub use log_entry::{LogEntry, RESERVED_KEYS};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use output_format::ConsoleFormat;
pub use registry::LoggingRegistry;
pub use retry::RetryStrategy;
pub use timestamp::TimestampFormat;
pub use transport::Transport;
