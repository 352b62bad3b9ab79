//! Main logger implementation
//!
//! Every transport owns a bounded queue drained by its own worker task, so a
//! slow or failing sink never holds up the others and entries reach each sink
//! in submission order. `log()` itself never awaits.

use super::{
    config::LoggerConfig,
    error::{LoggerError, Result},
    log_context::LogContext,
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    transport::Transport,
};
use crate::diagnostics::{self, DiagnosticProvider, PatternDiagnostics};
#[cfg(feature = "database")]
use crate::transports::DatabaseTransport;
#[cfg(feature = "http")]
use crate::transports::HttpTransport;
#[cfg(feature = "webhook")]
use crate::transports::WebhookTransport;
use crate::transports::{ConsoleTransport, FileTransport, OptimizeOptions};
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::any::Any;
use std::io::IsTerminal;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Entries each transport may have queued before new ones are dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How long `flush()` and `close()` wait on each transport
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Write(Arc<LogEntry>),
    Flush(oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<Result<()>>),
}

struct TransportHandle {
    transport: Arc<dyn Transport>,
    sender: mpsc::Sender<Command>,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    level: LogLevel,
    transports: Vec<TransportHandle>,
    metrics: Arc<LoggerMetrics>,
    diagnostics: Arc<dyn DiagnosticProvider>,
    interactive: bool,
    use_colors: bool,
    shutdown_timeout: Duration,
    closed: AtomicBool,
}

/// Fan-out logger
///
/// Cheap to clone; clones and children share transports and metrics.
///
/// # Example
///
/// ```no_run
/// use log_pipeline::prelude::*;
///
/// # async fn example() -> log_pipeline::Result<()> {
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .transport(ConsoleTransport::new())
///     .build()?;
///
/// let requests = logger.child(LogContext::new().with_field("component", "http"));
/// requests.info_with_context("request done", LogContext::new().with_field("statusCode", 200));
///
/// logger.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
    context: LogContext,
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build every transport the configuration enables
    ///
    /// A transport that fails to initialize is reported and left out. When
    /// none initialize, console output is used so entries are never silently
    /// lost.
    ///
    /// # Errors
    ///
    /// Returns error only when called outside a tokio runtime
    pub async fn from_config(config: &LoggerConfig) -> Result<Logger> {
        let minimal = config.is_minimal();
        let development = config.service.is_development();
        let mut builder = Logger::builder()
            .level(config.level)
            .context(config.default_context())
            .visual_errors(config.visual_errors)
            .colors(config.console.colors);

        if config.console.enabled {
            builder = builder.transport(ConsoleTransport::from_config(&config.console));
        }

        if config.file.enabled {
            match FileTransport::new(&config.file, OptimizeOptions::for_scope(minimal, development))
                .await
            {
                Ok(transport) => builder = builder.transport(transport),
                Err(e) => report_init_failure("file", &e),
            }
        }

        #[cfg(feature = "database")]
        if let Some(db) = &config.database {
            match DatabaseTransport::connect(db, &config.service, config.scope).await {
                Ok(transport) => builder = builder.transport(transport),
                Err(e) => report_init_failure("database", &e),
            }
        }

        #[cfg(feature = "http")]
        if let Some(http) = &config.http {
            match HttpTransport::new(http, &config.service, config.scope) {
                Ok(transport) => builder = builder.transport(transport),
                Err(e) => report_init_failure("http", &e),
            }
        }

        #[cfg(feature = "webhook")]
        if let Some(webhook) = &config.webhook {
            match WebhookTransport::new(webhook, &config.service, config.scope) {
                Ok(transport) => builder = builder.transport(transport),
                Err(e) => report_init_failure("webhook", &e),
            }
        }

        for name in disabled_transports(config) {
            report_init_failure(name, &LoggerError::config(name, "cargo feature not enabled"));
        }

        builder.build()
    }

    /// A logger sharing this one's transports with `bindings` added to its context
    ///
    /// The parent's context is left untouched.
    #[must_use]
    pub fn child(&self, bindings: LogContext) -> Logger {
        Logger {
            shared: Arc::clone(&self.shared),
            context: self.context.merged(&bindings),
        }
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    pub fn level(&self) -> LogLevel {
        self.shared.level
    }

    /// Names of the active transports, in registration order
    pub fn transport_names(&self) -> Vec<&str> {
        self.shared
            .transports
            .iter()
            .map(|h| h.transport.name())
            .collect()
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.shared.metrics
    }

    /// Get the number of dropped logs
    pub fn dropped_count(&self) -> u64 {
        self.shared.metrics.dropped_count()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_with_context(level, message, LogContext::new());
    }

    /// Log with structured context fields
    ///
    /// Call-site fields override child bindings, which override the default
    /// context.
    pub fn log_with_context(&self, level: LogLevel, message: impl Into<String>, context: LogContext) {
        let shared = &self.shared;
        if !LogLevel::should_log(level, shared.level) {
            shared.metrics.record_filtered();
            return;
        }
        if self.is_closed() {
            shared.metrics.record_dropped();
            return;
        }

        let entry = Arc::new(LogEntry::new(level, message).with_fields(self.context.merged(&context)));

        for handle in &shared.transports {
            if !handle.transport.should_log(level, shared.level) {
                continue;
            }
            match handle.sender.try_send(Command::Write(Arc::clone(&entry))) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    shared.metrics.record_queue_full();
                    self.alert_and_drop(handle.transport.name());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Worker already shut down
                }
            }
        }

        if level == LogLevel::Error && shared.interactive {
            if let Some(block) = self.render_diagnostic(&entry.message, &entry.fields) {
                eprintln!("{}", block);
            }
        }
    }

    /// Drop an entry for one transport with alert notification
    fn alert_and_drop(&self, transport: &str) {
        let dropped_count = self.shared.metrics.record_dropped();

        // Alert on first drop and periodically thereafter
        if dropped_count == 0 || (dropped_count + 1) % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue full for transport '{}', {} logs dropped.",
                transport,
                dropped_count + 1
            );
        }
    }

    /// Diagnostic block for an error message, or `None` if rendering failed
    pub fn render_diagnostic(&self, message: &str, context: &LogContext) -> Option<String> {
        let provider = Arc::clone(&self.shared.diagnostics);
        let use_colors = self.shared.use_colors;
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            let diagnosis = provider.diagnose(message, context);
            diagnostics::render(&diagnosis, use_colors)
        }))
        .ok()
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    /// Log an error; interactive terminals also get a diagnostic block
    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn debug_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Debug, message, context);
    }

    /// Helper for structured info logging
    pub fn info_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Info, message, context);
    }

    pub fn warn_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Warn, message, context);
    }

    /// Helper for structured error logging
    pub fn error_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Error, message, context);
    }

    /// Wait until every transport has written what was queued before this call
    /// and flushed its buffers
    ///
    /// Per-transport failures are reported to stderr, never returned.
    pub async fn flush(&self) {
        self.broadcast(Command::Flush, "flush").await;
    }

    /// Flush, then close every transport in parallel
    ///
    /// Calling it again is a no-op.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.broadcast(Command::Flush, "flush").await;
        self.broadcast(Command::Close, "close").await;

        let workers: Vec<JoinHandle<()>> = self
            .shared
            .transports
            .iter()
            .filter_map(|h| h.worker.lock().take())
            .collect();
        let budget = self.shared.shutdown_timeout;
        for mut worker in workers {
            if tokio::time::timeout(budget, &mut worker).await.is_err() {
                worker.abort();
                eprintln!(
                    "[LOGGER WARNING] Transport worker did not finish within {:?} timeout. \
                     Some logs may be lost.",
                    budget
                );
            }
        }

        let dropped = self.shared.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped logs (drop rate: {:.2}%)",
                dropped,
                self.shared.metrics.drop_rate()
            );
        }
    }

    async fn broadcast<F>(&self, make: F, operation: &str)
    where
        F: Fn(oneshot::Sender<Result<()>>) -> Command,
    {
        let budget = self.shared.shutdown_timeout;
        let pending = self.shared.transports.iter().map(|handle| {
            let (reply, response) = oneshot::channel();
            let command = make(reply);
            async move {
                let name = handle.transport.name();
                // A full queue in front of a stuck worker must not hold the caller
                let round_trip = async {
                    if handle.sender.send(command).await.is_err() {
                        return Ok(());
                    }
                    response.await.unwrap_or(Ok(()))
                };
                let result = match tokio::time::timeout(budget, round_trip).await {
                    Ok(result) => result,
                    Err(_) => Err(LoggerError::timeout(format!("{} {}", name, operation), budget)),
                };
                (name, result)
            }
        });

        for (name, result) in join_all(pending).await {
            if let Err(e) = result {
                self.shared.metrics.record_transport_error();
                eprintln!("[LOGGER ERROR] Transport '{}' {} failed: {}", name, operation, e);
            }
        }
    }
}

fn report_init_failure(name: &str, error: &LoggerError) {
    eprintln!(
        "[LOGGER ERROR] Failed to initialize {} transport: {}. Other transports are unaffected.",
        name, error
    );
}

/// Transports the configuration asks for that this build cannot provide
fn disabled_transports(config: &LoggerConfig) -> Vec<&'static str> {
    let mut disabled = Vec::new();
    if config.database.is_some() && !cfg!(feature = "database") {
        disabled.push("database");
    }
    if config.http.is_some() && !cfg!(feature = "http") {
        disabled.push("http");
    }
    if config.webhook.is_some() && !cfg!(feature = "webhook") {
        disabled.push("webhook");
    }
    disabled
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Drain one transport's queue until it is closed
///
/// **Per-Transport Panic Isolation**: every call is wrapped in `catch_unwind`,
/// so a panicking transport loses the entry but keeps its worker alive.
async fn run_worker(
    transport: Arc<dyn Transport>,
    mut receiver: mpsc::Receiver<Command>,
    metrics: Arc<LoggerMetrics>,
) {
    let name = transport.name().to_string();

    while let Some(command) = receiver.recv().await {
        match command {
            Command::Write(entry) => {
                let outcome = AssertUnwindSafe(transport.write(&entry)).catch_unwind().await;
                match outcome {
                    Ok(Ok(())) => {
                        metrics.record_logged();
                    }
                    Ok(Err(e @ LoggerError::RateLimited { .. })) => {
                        metrics.record_dropped();
                        eprintln!("[LOGGER WARNING] Transport '{}': {}", name, e);
                    }
                    Ok(Err(e)) => {
                        metrics.record_transport_error();
                        eprintln!("[LOGGER ERROR] Transport '{}' failed: {}", name, e);
                    }
                    Err(panic_info) => {
                        metrics.record_transport_error();
                        eprintln!(
                            "[LOGGER CRITICAL] Transport '{}' panicked: {}. \
                             Other transports continue to function.",
                            name,
                            panic_message(&*panic_info)
                        );
                    }
                }
            }
            Command::Flush(reply) => {
                let result = AssertUnwindSafe(transport.flush())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|p| Err(LoggerError::other(format!("panicked: {}", panic_message(&*p)))));
                let _ = reply.send(result);
            }
            Command::Close(reply) => {
                let result = AssertUnwindSafe(transport.close())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|p| Err(LoggerError::other(format!("panicked: {}", panic_message(&*p)))));
                let _ = reply.send(result);
                return;
            }
        }
    }

    // Every sender dropped without close(): release the transport anyway
    if let Err(e) = transport.close().await {
        eprintln!("[LOGGER ERROR] Transport '{}' close failed: {}", name, e);
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use log_pipeline::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> log_pipeline::Result<()> {
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .transport(ConsoleTransport::new())
///     .queue_capacity(256)
///     .build()?;
/// assert_eq!(logger.transport_names(), vec!["console"]);
/// logger.close().await;
/// # Ok(())
/// # }
/// ```
pub struct LoggerBuilder {
    level: LogLevel,
    transports: Vec<Arc<dyn Transport>>,
    context: LogContext,
    queue_capacity: usize,
    diagnostics: Option<Arc<dyn DiagnosticProvider>>,
    visual_errors: bool,
    colors: bool,
    shutdown_timeout: Duration,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            transports: Vec::new(),
            context: LogContext::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            diagnostics: None,
            visual_errors: false,
            colors: false,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Add a transport
    #[must_use = "builder methods return a new value"]
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transports.push(Arc::new(transport));
        self
    }

    /// Default context merged into every entry
    #[must_use = "builder methods return a new value"]
    pub fn context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    /// Per-transport queue capacity
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Replace the pattern-based diagnostic provider
    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, provider: Arc<dyn DiagnosticProvider>) -> Self {
        self.diagnostics = Some(provider);
        self
    }

    /// Render diagnostics for errors when stderr is a terminal
    #[must_use = "builder methods return a new value"]
    pub fn visual_errors(mut self, enabled: bool) -> Self {
        self.visual_errors = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    /// Upper bound on each transport's flush, close and worker shutdown
    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Build the Logger and start one worker per transport
    ///
    /// # Errors
    ///
    /// Returns error when called outside a tokio runtime
    pub fn build(self) -> Result<Logger> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LoggerError::other(format!("Logger requires a tokio runtime: {}", e)))?;

        let mut transports = self.transports;
        if transports.is_empty() {
            eprintln!("[LOGGER WARNING] No transports initialized, falling back to console output.");
            transports.push(Arc::new(ConsoleTransport::new().with_colors(self.colors)));
        }

        let metrics = Arc::new(LoggerMetrics::new());
        let handles = transports
            .into_iter()
            .map(|transport| {
                let (sender, receiver) = mpsc::channel(self.queue_capacity);
                let worker = runtime.spawn(run_worker(
                    Arc::clone(&transport),
                    receiver,
                    Arc::clone(&metrics),
                ));
                TransportHandle {
                    transport,
                    sender,
                    worker: parking_lot::Mutex::new(Some(worker)),
                }
            })
            .collect();

        Ok(Logger {
            shared: Arc::new(Shared {
                level: self.level,
                transports: handles,
                metrics,
                diagnostics: self
                    .diagnostics
                    .unwrap_or_else(|| Arc::new(PatternDiagnostics::new())),
                interactive: self.visual_errors && std::io::stderr().is_terminal(),
                use_colors: self.colors,
                shutdown_timeout: self.shutdown_timeout,
                closed: AtomicBool::new(false),
            }),
            context: self.context,
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records everything it receives
    #[derive(Clone, Default)]
    struct Recording {
        entries: Arc<Mutex<Vec<LogEntry>>>,
        flushes: Arc<Mutex<usize>>,
        closes: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Transport for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn write(&self, entry: &LogEntry) -> Result<()> {
            self.entries.lock().push(entry.clone());
            Ok(())
        }

        async fn flush(&self) -> Result<()> {
            *self.flushes.lock() += 1;
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            *self.closes.lock() += 1;
            Ok(())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Transport for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn write(&self, _entry: &LogEntry) -> Result<()> {
            panic!("sink exploded");
        }

        async fn flush(&self) -> Result<()> {
            Err(LoggerError::other("flush refused"))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Blocks its worker until released
    struct Stalled {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl Transport for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn write(&self, _entry: &LogEntry) -> Result<()> {
            self.gate.notified().await;
            Ok(())
        }

        async fn flush(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_level_filtering() {
        let sink = Recording::default();
        let logger = Logger::builder()
            .level(LogLevel::Warn)
            .transport(sink.clone())
            .build()
            .unwrap();

        logger.debug("hidden");
        logger.info("hidden");
        logger.warn("shown");
        logger.error("shown");
        logger.flush().await;

        let levels: Vec<LogLevel> = sink.entries.lock().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error]);
        assert_eq!(logger.metrics().filtered_count(), 2);
        logger.close().await;
    }

    #[tokio::test]
    async fn test_context_precedence() {
        let sink = Recording::default();
        let logger = Logger::builder()
            .transport(sink.clone())
            .context(
                LogContext::new()
                    .with_field("service", "api")
                    .with_field("component", "root"),
            )
            .build()
            .unwrap();

        let child = logger.child(
            LogContext::new()
                .with_field("component", "db")
                .with_field("requestId", "r1"),
        );
        child.info_with_context("query", LogContext::new().with_field("requestId", "r2"));
        logger.info("parent");
        logger.flush().await;

        let entries = sink.entries.lock().clone();
        let first = &entries[0];
        assert_eq!(first.field("service").and_then(|v| v.as_str()), Some("api"));
        assert_eq!(first.field("component").and_then(|v| v.as_str()), Some("db"));
        assert_eq!(first.field("requestId").and_then(|v| v.as_str()), Some("r2"));

        let second = &entries[1];
        assert_eq!(second.field("component").and_then(|v| v.as_str()), Some("root"));
        assert!(second.field("requestId").is_none());
        assert!(!logger.context().contains_key("requestId"));
        logger.close().await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let sink = Recording::default();
        let logger = Logger::builder().transport(sink.clone()).build().unwrap();
        logger.info("one");
        logger.close().await;
        logger.close().await;

        assert_eq!(*sink.closes.lock(), 1);
        assert_eq!(*sink.flushes.lock(), 1);
        assert_eq!(sink.entries.lock().len(), 1);

        logger.info("after close");
        assert_eq!(sink.entries.lock().len(), 1);
        assert!(logger.is_closed());
    }

    #[tokio::test]
    async fn test_panicking_transport_is_isolated() {
        let sink = Recording::default();
        let logger = Logger::builder()
            .transport(Panicking)
            .transport(sink.clone())
            .build()
            .unwrap();

        logger.info("first");
        logger.info("second");
        logger.flush().await;

        assert_eq!(sink.entries.lock().len(), 2);
        // Two panicking writes plus one failed flush
        assert_eq!(logger.metrics().transport_errors(), 3);
        logger.close().await;
    }

    #[tokio::test]
    async fn test_full_queue_drops_for_that_transport_only() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let sink = Recording::default();
        let logger = Logger::builder()
            .queue_capacity(2)
            .transport(Stalled {
                gate: Arc::clone(&gate),
            })
            .transport(sink.clone())
            .build()
            .unwrap();

        for i in 0..10 {
            logger.info(format!("entry {}", i));
            tokio::task::yield_now().await;
        }
        wait_for(&sink, 10).await;

        assert!(logger.metrics().queue_full_events() > 0);
        assert!(logger.dropped_count() > 0);
        assert_eq!(sink.entries.lock().len(), 10);

        gate.notify_waiters();
    }

    /// Poll the sink directly; `flush()` would wait on the stalled worker
    async fn wait_for(sink: &Recording, count: usize) {
        for _ in 0..100 {
            if sink.entries.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_fallback_to_console() {
        let logger = Logger::builder().build().unwrap();
        assert_eq!(logger.transport_names(), vec!["console"]);
        logger.close().await;
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        assert!(Logger::builder().build().is_err());
    }

    #[tokio::test]
    async fn test_render_diagnostic_never_panics() {
        struct Exploding;
        impl DiagnosticProvider for Exploding {
            fn diagnose(&self, _message: &str, _context: &LogContext) -> crate::diagnostics::Diagnosis {
                panic!("provider bug");
            }
        }

        let logger = Logger::builder()
            .transport(Recording::default())
            .diagnostics(Arc::new(Exploding))
            .build()
            .unwrap();
        assert!(logger
            .render_diagnostic("listen EADDRINUSE", &LogContext::new())
            .is_none());

        let default = Logger::builder()
            .transport(Recording::default())
            .build()
            .unwrap();
        let block = default
            .render_diagnostic("listen EADDRINUSE: address already in use :::8080", &LogContext::new())
            .unwrap();
        assert!(block.contains("Port already in use"));
        logger.close().await;
        default.close().await;
    }

    /// Never finishes a write
    struct Hung;

    #[async_trait]
    impl Transport for Hung {
        fn name(&self) -> &str {
            "hung"
        }

        async fn write(&self, _entry: &LogEntry) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn flush(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_flush_and_close_are_bounded_by_a_stuck_worker() {
        let healthy = Recording::default();
        let logger = Logger::builder()
            .queue_capacity(1)
            .shutdown_timeout(Duration::from_millis(100))
            .transport(Hung)
            .transport(healthy.clone())
            .build()
            .unwrap();

        for i in 0..3 {
            logger.info(format!("entry {}", i));
        }

        let flushed = tokio::time::timeout(Duration::from_secs(2), logger.flush()).await;
        assert!(flushed.is_ok(), "flush() blocked behind a full queue");
        assert!(logger.metrics().transport_errors() >= 1);

        let closed = tokio::time::timeout(Duration::from_secs(2), logger.close()).await;
        assert!(closed.is_ok(), "close() blocked behind a full queue");
        assert!(logger.is_closed());
        assert_eq!(*healthy.closes.lock(), 1);
    }

    #[test]
    fn test_disabled_transports_follow_cargo_features() {
        use crate::core::{DatabaseConfig, HttpConfig, WebhookConfig};

        assert!(disabled_transports(&LoggerConfig::default()).is_empty());

        let config = LoggerConfig {
            database: Some(DatabaseConfig::new("sqlite::memory:")),
            http: Some(HttpConfig::new("http://127.0.0.1:9/ingest")),
            webhook: Some(WebhookConfig::new("http://127.0.0.1:9/alerts")),
            ..LoggerConfig::default()
        };
        let disabled = disabled_transports(&config);
        assert_eq!(disabled.contains(&"database"), !cfg!(feature = "database"));
        assert_eq!(disabled.contains(&"http"), !cfg!(feature = "http"));
        assert_eq!(disabled.contains(&"webhook"), !cfg!(feature = "webhook"));
    }
}
