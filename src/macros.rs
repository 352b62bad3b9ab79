//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. An optional
//! `{ key => value, ... }` block before the format string attaches fields.
//!
//! # Examples
//!
//! ```no_run
//! use log_pipeline::prelude::*;
//! use log_pipeline::{error, info};
//!
//! # async fn example() -> log_pipeline::Result<()> {
//! let logger = Logger::builder().transport(ConsoleTransport::new()).build()?;
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With structured fields
//! error!(logger, { "component" => "db", "retries" => 3 }, "Connection lost after {}s", 30);
//! # Ok(())
//! # }
//! ```

/// Build a [`LogContext`](crate::LogContext) from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use log_pipeline::context;
///
/// let ctx = context! { "component" => "db", "attempt" => 2 };
/// assert_eq!(ctx.len(), 2);
/// assert!(context!().is_empty());
/// ```
#[macro_export]
macro_rules! context {
    () => {
        $crate::LogContext::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::LogContext::new()$(.with_field($key, $value))+
    };
}

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```no_run
/// # use log_pipeline::prelude::*;
/// # async fn example() -> log_pipeline::Result<()> {
/// # let logger = Logger::builder().build()?;
/// use log_pipeline::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warn, { "component" => "cache" }, "Evicted {} keys", 12);
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, { $($key:expr => $value:expr),* $(,)? }, $($arg:tt)+) => {
        $logger.log_with_context($level, format!($($arg)+), $crate::context!($($key => $value),*))
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// Interactive terminals also get a diagnostic block when visual errors are
/// enabled.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogEntry, LogLevel, Logger, Result, Transport};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<LogEntry>>>);

    #[async_trait]
    impl Transport for Capture {
        fn name(&self) -> &str {
            "capture"
        }

        async fn write(&self, entry: &LogEntry) -> Result<()> {
            self.0.lock().push(entry.clone());
            Ok(())
        }

        async fn flush(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_context_macro() {
        let ctx = context! { "component" => "db", "port" => 5432, "ok" => true, };
        assert_eq!(ctx.get("component").and_then(|v| v.as_str()), Some("db"));
        assert_eq!(ctx.get("port").and_then(|v| v.as_i64()), Some(5432));
        assert_eq!(ctx.len(), 3);
    }

    #[tokio::test]
    async fn test_level_macros() {
        let capture = Capture::default();
        let logger = Logger::builder()
            .level(LogLevel::Debug)
            .transport(capture.clone())
            .build()
            .unwrap();

        debug!(logger, "Debug message");
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        log!(logger, LogLevel::Info, "Formatted: {}", 42);
        logger.flush().await;

        let messages: Vec<String> = capture.0.lock().iter().map(|e| e.message.clone()).collect();
        assert_eq!(
            messages,
            vec!["Debug message", "Items: 100", "Retry 1 of 3", "Code: 500", "Formatted: 42"]
        );
        logger.close().await;
    }

    #[tokio::test]
    async fn test_macros_with_fields() {
        let capture = Capture::default();
        let logger = Logger::builder().transport(capture.clone()).build().unwrap();

        error!(logger, { "component" => "db", "attempt" => 3 }, "Connection lost after {}s", 30);
        info!(logger, {}, "no fields");
        logger.flush().await;

        let entries = capture.0.lock().clone();
        assert_eq!(entries[0].message, "Connection lost after 30s");
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(
            entries[0].field("component").and_then(|v| v.as_str()),
            Some("db")
        );
        assert!(entries[1].fields.is_empty());
        logger.close().await;
    }
}
