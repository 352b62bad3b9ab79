//! Console transport implementation

use crate::core::{ConsoleConfig, ConsoleFormat, LogEntry, Result, Transport};
use async_trait::async_trait;
use std::io::Write;

/// Immediate, unbuffered output to stdout/stderr
///
/// Errors and warnings go to stderr, everything else to stdout.
pub struct ConsoleTransport {
    use_colors: bool,
    format: ConsoleFormat,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            use_colors: false,
            format: ConsoleFormat::default(),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self {
            use_colors: config.colors,
            format: config.format,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set the rendering mode for this transport
    ///
    /// # Example
    ///
    /// ```
    /// use log_pipeline::transports::ConsoleTransport;
    /// use log_pipeline::ConsoleFormat;
    ///
    /// let transport = ConsoleTransport::new().with_format(ConsoleFormat::Minimal);
    /// ```
    #[must_use]
    pub fn with_format(mut self, format: ConsoleFormat) -> Self {
        self.format = format;
        self
    }

    /// The line this transport would print, if any
    pub fn render(&self, entry: &LogEntry) -> Option<String> {
        self.format.format(entry, self.use_colors)
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn write(&self, entry: &LogEntry) -> Result<()> {
        let Some(output) = self.render(entry) else {
            return Ok(());
        };

        if entry.level.is_stderr() {
            let mut err = std::io::stderr().lock();
            writeln!(err, "{}", output)?;
        } else {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", output)?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
