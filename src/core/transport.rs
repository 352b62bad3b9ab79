//! Transport trait for log delivery destinations

use super::{error::Result, log_entry::LogEntry, log_level::LogLevel};
use async_trait::async_trait;

/// A pluggable sink responsible for delivering entries to one destination
///
/// Methods take `&self`: transports share state with their own background
/// timers, so mutable state lives behind interior locks.
///
/// # Example
///
/// ```no_run
/// use log_pipeline::core::{LogEntry, Result, Transport};
/// use async_trait::async_trait;
///
/// struct StdoutTransport;
///
/// #[async_trait]
/// impl Transport for StdoutTransport {
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     async fn write(&self, entry: &LogEntry) -> Result<()> {
///         println!("{}", entry.message);
///         Ok(())
///     }
///
///     async fn flush(&self) -> Result<()> {
///         Ok(())
///     }
///
///     async fn close(&self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get the transport name
    fn name(&self) -> &str;

    /// Whether an entry at `level` passes the transport's filter
    fn should_log(&self, level: LogLevel, configured: LogLevel) -> bool {
        LogLevel::should_log(level, configured)
    }

    /// Deliver or enqueue one entry
    async fn write(&self, entry: &LogEntry) -> Result<()>;

    /// Deliver anything buffered
    async fn flush(&self) -> Result<()>;

    /// Stop timers, deliver anything buffered and release resources
    ///
    /// Calling it more than once must be a no-op.
    async fn close(&self) -> Result<()>;
}
