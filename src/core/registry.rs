//! Explicit owner of the resolved configuration and the loggers built from it
//!
//! Configuration is resolved on first use and cached until `reset()`. The root
//! logger and named loggers are created lazily and share one transport set.

use super::config::LoggerConfig;
use super::error::Result;
use super::log_context::LogContext;
use super::logger::Logger;
use std::collections::HashMap;
use std::sync::Arc;

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

enum ConfigSource {
    Lookup(Lookup),
    Fixed(LoggerConfig),
}

/// # Example
///
/// ```no_run
/// use log_pipeline::LoggingRegistry;
///
/// # async fn example() -> log_pipeline::Result<()> {
/// let registry = LoggingRegistry::from_env();
/// let db = registry.get("database").await?;
/// db.info("pool ready");
///
/// registry.reset().await;
/// # Ok(())
/// # }
/// ```
pub struct LoggingRegistry {
    source: ConfigSource,
    config: parking_lot::Mutex<Option<Arc<LoggerConfig>>>,
    root: tokio::sync::Mutex<Option<Logger>>,
    named: parking_lot::Mutex<HashMap<String, Logger>>,
}

impl LoggingRegistry {
    /// Resolve configuration from process environment variables
    pub fn from_env() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::from_source(ConfigSource::Lookup(Box::new(lookup)))
    }

    /// Use an already-built configuration
    pub fn with_config(config: LoggerConfig) -> Self {
        Self::from_source(ConfigSource::Fixed(config))
    }

    fn from_source(source: ConfigSource) -> Self {
        Self {
            source,
            config: parking_lot::Mutex::new(None),
            root: tokio::sync::Mutex::new(None),
            named: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// The resolved configuration, cached after the first call
    ///
    /// # Errors
    ///
    /// Returns error if an environment value is invalid
    pub fn config(&self) -> Result<Arc<LoggerConfig>> {
        let mut cached = self.config.lock();
        if let Some(config) = cached.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = match &self.source {
            ConfigSource::Lookup(lookup) => LoggerConfig::from_lookup(|key| lookup(key))?,
            ConfigSource::Fixed(config) => {
                config.validate()?;
                config.clone()
            }
        };
        let config = Arc::new(config);
        *cached = Some(Arc::clone(&config));
        Ok(config)
    }

    /// The process-wide logger, built on first use
    pub async fn root(&self) -> Result<Logger> {
        let mut root = self.root.lock().await;
        if let Some(logger) = root.as_ref() {
            return Ok(logger.clone());
        }
        let config = self.config()?;
        let logger = Logger::from_config(&config).await?;
        *root = Some(logger.clone());
        Ok(logger)
    }

    /// A child of the root logger bound to `{"logger": name}`, cached by name
    pub async fn get(&self, name: &str) -> Result<Logger> {
        if let Some(logger) = self.named.lock().get(name) {
            return Ok(logger.clone());
        }
        let root = self.root().await?;
        let mut named = self.named.lock();
        let logger = named
            .entry(name.to_string())
            .or_insert_with(|| root.child(LogContext::new().with_field("logger", name)));
        Ok(logger.clone())
    }

    /// Flush all transports of the root logger, if one was built
    pub async fn flush(&self) {
        let root = self.root.lock().await.clone();
        if let Some(root) = root {
            root.flush().await;
        }
    }

    /// Close the root logger and forget every cached value
    ///
    /// The next call resolves configuration and builds transports afresh.
    pub async fn reset(&self) {
        let root = self.root.lock().await.take();
        self.named.lock().clear();
        *self.config.lock() = None;
        if let Some(root) = root {
            root.close().await;
        }
    }
}
