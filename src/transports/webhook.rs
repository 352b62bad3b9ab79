//! Webhook transport for chat alerting
//!
//! Sends each accepted entry immediately, never batched. A sliding window
//! caps the number of sends; entries over the cap are dropped, not queued.

use crate::core::{
    FieldValue, LogEntry, LogLevel, LoggerError, Result, RetryStrategy, Scope, ServiceInfo,
    Transport, WebhookConfig,
};
use crate::transports::optimize::{optimize_entry, OptimizeOptions};
use crate::transports::timer::PeriodicTask;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Sliding list of send instants, pruned to the window
#[derive(Debug)]
pub struct RateWindow {
    sent: Mutex<VecDeque<Instant>>,
    limit: usize,
    window: Duration,
}

impl RateWindow {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            sent: Mutex::new(VecDeque::with_capacity(limit)),
            limit,
            window,
        }
    }

    /// Claim a slot at `now`, or fail when the window is already full
    pub fn try_acquire(&self, now: Instant) -> bool {
        let mut sent = self.sent.lock();
        Self::prune(&mut sent, now, self.window);
        if sent.len() >= self.limit {
            return false;
        }
        sent.push_back(now);
        true
    }

    /// Drop instants that fell out of the window
    pub fn cleanup(&self, now: Instant) {
        Self::prune(&mut self.sent.lock(), now, self.window);
    }

    pub fn in_window(&self) -> usize {
        self.sent.lock().len()
    }

    fn prune(sent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(first) = sent.front() {
            if now.saturating_duration_since(*first) > window {
                sent.pop_front();
            } else {
                break;
            }
        }
    }
}

struct WebhookInner {
    client: reqwest::Client,
    url: Url,
    slack: bool,
    min_level: LogLevel,
    retry: RetryStrategy,
    service: ServiceInfo,
    options: OptimizeOptions,
    window: RateWindow,
}

/// Rate-limited alerting to Slack or a generic webhook endpoint
pub struct WebhookTransport {
    inner: Arc<WebhookInner>,
    cleanup: Mutex<Option<PeriodicTask>>,
    closed: AtomicBool,
}

impl WebhookTransport {
    /// # Errors
    ///
    /// Returns error if the URL is invalid, the client cannot be built or no
    /// tokio runtime is running
    pub fn new(config: &WebhookConfig, service: &ServiceInfo, scope: Scope) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| LoggerError::config("WebhookTransport", format!("invalid URL: {}", e)))?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let inner = Arc::new(WebhookInner {
            client,
            slack: is_slack(&url),
            url,
            min_level: config.min_level,
            retry: config.retry.clone(),
            service: service.clone(),
            options: OptimizeOptions::alert(scope.is_minimal()),
            window: RateWindow::new(config.rate_limit, config.rate_window),
        });

        let pruning = Arc::clone(&inner);
        let cleanup = PeriodicTask::spawn(config.rate_window, false, move || {
            let inner = Arc::clone(&pruning);
            async move { inner.window.cleanup(Instant::now()) }
        })?;

        Ok(Self {
            inner,
            cleanup: Mutex::new(Some(cleanup)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_slack(&self) -> bool {
        self.inner.slack
    }

    /// Payload that would be posted for `entry`
    pub fn payload(&self, entry: &LogEntry) -> Value {
        let doc = optimize_entry(entry, self.inner.options);
        if self.inner.slack {
            slack_payload(entry, &doc, &self.inner.service)
        } else {
            generic_payload(entry, &doc, &self.inner.service)
        }
    }
}

impl WebhookInner {
    async fn deliver(&self, payload: &Value) -> Result<()> {
        let mut attempt = 1;
        loop {
            let outcome = match self.client.post(self.url.clone()).json(payload).send().await {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => Err(format!("status {}", response.status())),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(()) => return Ok(()),
                Err(message) => match self.retry.delay_after(attempt) {
                    Some(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(LoggerError::delivery("webhook", attempt, message)),
                },
            }
        }
    }
}

fn is_slack(url: &Url) -> bool {
    url.host_str()
        .map(|host| host.eq_ignore_ascii_case("hooks.slack.com"))
        .unwrap_or(false)
}

fn slack_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "danger",
        LogLevel::Warn => "warning",
        LogLevel::Info => "good",
        LogLevel::Debug => "#808080",
    }
}

fn slack_emoji(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => ":rotating_light:",
        LogLevel::Warn => ":warning:",
        LogLevel::Info => ":information_source:",
        LogLevel::Debug => ":mag:",
    }
}

/// `error→critical, warn→warning, info→info, debug→low`
pub fn severity(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "critical",
        LogLevel::Warn => "warning",
        LogLevel::Info => "info",
        LogLevel::Debug => "low",
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn slack_payload(entry: &LogEntry, doc: &Value, service: &ServiceInfo) -> Value {
    let mut fields = Vec::new();
    let mut field = |title: &str, value: String, short: bool| {
        fields.push(json!({ "title": title, "value": value, "short": short }));
    };

    let component = entry.field("component").map(FieldValue::to_plain_string);
    if let Some(component) = component {
        field("Component", component, true);
    }
    field("Service", service.name.clone(), true);
    field("Environment", service.environment.clone(), true);

    let method = doc.get("method").map(plain);
    let url = doc.get("url").map(plain);
    if method.is_some() || url.is_some() {
        let request = [method, url].into_iter().flatten().collect::<Vec<_>>().join(" ");
        field("Request", request, false);
    }
    if let Some(status) = doc.get("statusCode") {
        field("Status", plain(status), true);
    }
    if let Some(duration) = doc.get("duration") {
        field("Duration", plain(duration), true);
    }
    if let Some(error) = doc.get("error") {
        let text = error
            .get("message")
            .map(plain)
            .unwrap_or_else(|| plain(error));
        field("Error", text, false);
    }
    for key in ["userId", "user_id"] {
        if let Some(user) = doc.get(key) {
            field("User", plain(user), true);
            break;
        }
    }
    for key in ["requestId", "request_id"] {
        if let Some(request) = doc.get(key) {
            field("Request ID", plain(request), true);
            break;
        }
    }

    json!({
        "text": format!("{} *{}*: {}", slack_emoji(entry.level), entry.level.label(), entry.message),
        "attachments": [{
            "color": slack_color(entry.level),
            "fields": fields,
            "footer": format!("{} v{}", service.name, service.version),
            "ts": entry.timestamp.timestamp(),
        }],
    })
}

fn generic_payload(entry: &LogEntry, doc: &Value, service: &ServiceInfo) -> Value {
    json!({
        "severity": severity(entry.level),
        "level": entry.level.to_str(),
        "message": entry.message,
        "timestamp": entry.timestamp_iso(),
        "service": service.name,
        "environment": service.environment,
        "version": service.version,
        "details": doc,
    })
}

#[async_trait]
impl Transport for WebhookTransport {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn write(&self, entry: &LogEntry) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::TransportClosed("webhook".to_string()));
        }
        if !LogLevel::should_log(entry.level, self.inner.min_level) {
            return Ok(());
        }
        if !self.inner.window.try_acquire(Instant::now()) {
            return Err(LoggerError::RateLimited {
                limit: self.inner.window.limit,
                window: self.inner.window.window,
            });
        }
        let payload = self.payload(entry);
        self.inner.deliver(&payload).await
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup.stop().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogContext;

    fn service() -> ServiceInfo {
        ServiceInfo {
            name: "billing".to_string(),
            version: "2.0.0".to_string(),
            environment: "production".to_string(),
        }
    }

    fn config(url: String, limit: usize) -> WebhookConfig {
        WebhookConfig {
            rate_limit: limit,
            retry: RetryStrategy::webhook_default().with_base(Duration::from_millis(5)),
            ..WebhookConfig::new(url)
        }
    }

    fn alert(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Error, message).with_fields(
            LogContext::new()
                .with_field("component", "payments")
                .with_field("requestId", "req-42")
                .with_field("stack", "at charge (pay.rs:7)"),
        )
    }

    #[test]
    fn test_rate_window_slides() {
        let window = RateWindow::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(window.try_acquire(start));
        assert!(window.try_acquire(start + Duration::from_secs(1)));
        assert!(!window.try_acquire(start + Duration::from_secs(2)));
        assert!(window.try_acquire(start + Duration::from_secs(61)));
        assert_eq!(window.in_window(), 2);

        window.cleanup(start + Duration::from_secs(200));
        assert_eq!(window.in_window(), 0);
    }

    #[test]
    fn test_send_exactly_one_window_old_still_counts() {
        let window = RateWindow::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(window.try_acquire(start));
        assert!(!window.try_acquire(start + Duration::from_secs(60)));
        assert_eq!(window.in_window(), 1);
        assert!(window.try_acquire(start + Duration::from_millis(60_001)));
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity(LogLevel::Error), "critical");
        assert_eq!(severity(LogLevel::Warn), "warning");
        assert_eq!(severity(LogLevel::Info), "info");
        assert_eq!(severity(LogLevel::Debug), "low");
    }

    #[tokio::test]
    async fn test_slack_payload_shape() {
        let transport = WebhookTransport::new(
            &config("https://hooks.slack.com/services/T0/B0/XYZ".to_string(), 10),
            &service(),
            Scope::Full,
        )
        .unwrap();
        assert!(transport.is_slack());

        let payload = transport.payload(&alert("Charge failed"));
        assert!(payload["text"].as_str().unwrap().contains(":rotating_light:"));
        assert!(payload["text"].as_str().unwrap().contains("Charge failed"));
        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "danger");
        assert_eq!(attachment["footer"], "billing v2.0.0");
        assert!(attachment["ts"].is_i64());

        let fields = attachment["fields"].as_array().unwrap();
        let titles: Vec<&str> = fields.iter().map(|f| f["title"].as_str().unwrap()).collect();
        assert!(titles.contains(&"Component"));
        assert!(titles.contains(&"Environment"));
        assert!(titles.contains(&"Request ID"));
        assert!(!payload.to_string().contains("pay.rs"));
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_generic_payload_never_carries_stack() {
        let transport = WebhookTransport::new(
            &config("https://alerts.example.com/hook".to_string(), 10),
            &service(),
            Scope::Full,
        )
        .unwrap();
        assert!(!transport.is_slack());

        let payload = transport.payload(&alert("Charge failed"));
        assert_eq!(payload["severity"], "critical");
        assert_eq!(payload["details"]["component"], "payments");
        assert!(payload["details"].get("stack").is_none());
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limit_drops_excess_alerts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let transport =
            WebhookTransport::new(&config(format!("{}/hook", server.url()), 2), &service(), Scope::Full)
                .unwrap();

        assert!(transport.write(&alert("one")).await.is_ok());
        assert!(transport.write(&alert("two")).await.is_ok());
        let third = transport.write(&alert("three")).await;
        assert!(matches!(third, Err(LoggerError::RateLimited { limit: 2, .. })));

        mock.assert_async().await;
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_below_min_level_is_ignored() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .expect(0)
            .create_async()
            .await;

        let transport =
            WebhookTransport::new(&config(format!("{}/hook", server.url()), 2), &service(), Scope::Full)
                .unwrap();
        transport
            .write(&LogEntry::new(LogLevel::Info, "fyi"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(transport.inner.window.in_window(), 0);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_retries_with_two_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let transport =
            WebhookTransport::new(&config(format!("{}/hook", server.url()), 5), &service(), Scope::Full)
                .unwrap();
        let result = transport.write(&alert("flaky")).await;
        assert!(matches!(result, Err(LoggerError::Delivery { attempts: 2, .. })));

        mock.assert_async().await;
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }
}
