//! # Log Pipeline
//!
//! Structured logging that fans each entry out to independent transports,
//! each with its own delivery semantics.
//!
//! ## Features
//!
//! - **Console**: minimal, pretty or standard rendering to stdout/stderr
//! - **Rotating files**: JSON lines, date and size rotation, retention sweep
//! - **Databases**: batched inserts into Postgres, MySQL or SQLite
//! - **HTTP ingestion**: Datadog, Elasticsearch, Splunk or generic endpoints
//! - **Webhooks**: rate-limited alerts, Slack-aware
//!
//! The database, HTTP and webhook transports sit behind the `database`,
//! `http` and `webhook` cargo features, all enabled by default.
//!
//! Transports never block each other: each one drains its own queue on its
//! own task, and a failing sink only loses its own entries.
//!
//! ```no_run
//! use log_pipeline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> log_pipeline::Result<()> {
//!     let registry = LoggingRegistry::from_env();
//!     let logger = registry.root().await?;
//!
//!     logger.error_with_context("DB down", LogContext::new().with_field("component", "db"));
//!
//!     registry.reset().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod diagnostics;
pub mod macros;
pub mod transports;

pub mod prelude {
    pub use crate::core::{
        ConsoleFormat, FieldValue, LogContext, LogEntry, LogLevel, Logger, LoggerBuilder,
        LoggerConfig, LoggerError, LoggerMetrics, LoggingRegistry, Result, Scope, Transport,
    };
    pub use crate::transports::{ConsoleTransport, FileTransport};

    #[cfg(feature = "database")]
    pub use crate::transports::DatabaseTransport;
    #[cfg(feature = "http")]
    pub use crate::transports::HttpTransport;
    #[cfg(feature = "webhook")]
    pub use crate::transports::WebhookTransport;
}

pub use crate::core::{
    ConsoleFormat, FieldValue, LogContext, LogEntry, LogLevel, Logger, LoggerBuilder,
    LoggerConfig, LoggerError, LoggerMetrics, LoggingRegistry, Result, RetryStrategy, Scope,
    ServiceInfo, Transport,
};
pub use diagnostics::{DiagnosticProvider, Diagnosis, PatternDiagnostics};
