//! HTTP transport for external log ingestion services
//!
//! Batches optimized entries and ships them with one POST per flush. The
//! payload shape follows the detected target service.

use crate::core::{
    HttpConfig, LogEntry, LoggerError, Result, RetryStrategy, Scope, ServiceInfo, Transport,
};
use crate::transports::batch::BatchQueue;
use crate::transports::optimize::{optimize_entry, OptimizeOptions};
use crate::transports::timer::PeriodicTask;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Ingestion service inferred from the endpoint URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Datadog,
    Elasticsearch,
    Splunk,
    Generic,
}

impl ServiceKind {
    pub fn detect(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        let path = url.path().to_lowercase();
        if host.contains("datadog") {
            ServiceKind::Datadog
        } else if path.contains("_bulk") || host.contains("elastic") {
            ServiceKind::Elasticsearch
        } else if host.contains("splunk") || path.contains("services/collector") {
            ServiceKind::Splunk
        } else {
            ServiceKind::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Datadog => "datadog",
            ServiceKind::Elasticsearch => "elasticsearch",
            ServiceKind::Splunk => "splunk",
            ServiceKind::Generic => "generic",
        }
    }
}

struct HttpInner {
    client: reqwest::Client,
    url: Url,
    kind: ServiceKind,
    api_key: Option<String>,
    timeout: Duration,
    retry: RetryStrategy,
    service: ServiceInfo,
    scope: Scope,
    options: OptimizeOptions,
    queue: BatchQueue<Value>,
}

/// Batched delivery to Datadog, Elasticsearch, Splunk or a generic endpoint
///
/// # Example
///
/// ```no_run
/// use log_pipeline::core::{HttpConfig, Scope, ServiceInfo};
/// use log_pipeline::transports::HttpTransport;
///
/// # async fn example() -> log_pipeline::Result<()> {
/// let config = HttpConfig::new("https://logs.example.com/ingest");
/// let transport = HttpTransport::new(&config, &ServiceInfo::default(), Scope::Full)?;
/// # Ok(())
/// # }
/// ```
pub struct HttpTransport {
    inner: Arc<HttpInner>,
    timer: parking_lot::Mutex<Option<PeriodicTask>>,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Build the client and start the periodic flush
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid, the client cannot be built or no
    /// tokio runtime is running
    pub fn new(config: &HttpConfig, service: &ServiceInfo, scope: Scope) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| LoggerError::config("HttpTransport", format!("invalid URL: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let inner = Arc::new(HttpInner {
            client,
            kind: ServiceKind::detect(&url),
            url,
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            retry: config.retry.clone(),
            service: service.clone(),
            scope,
            options: OptimizeOptions::for_scope(scope.is_minimal(), service.is_development()),
            queue: BatchQueue::new(config.batch_size),
        });

        let ticking = Arc::clone(&inner);
        let timer = PeriodicTask::spawn(config.flush_interval, false, move || {
            let inner = Arc::clone(&ticking);
            async move {
                if let Err(e) = inner.flush_batch().await {
                    eprintln!("[LOGGER WARNING] HTTP transport flush failed: {}", e);
                }
            }
        })?;

        Ok(Self {
            inner,
            timer: parking_lot::Mutex::new(Some(timer)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn service_kind(&self) -> ServiceKind {
        self.inner.kind
    }

    /// Entries waiting for the next flush
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }
}

impl HttpInner {
    async fn flush_batch(&self) -> Result<()> {
        let batch = self.queue.take();
        if batch.is_empty() {
            return Ok(());
        }

        let docs: Vec<Value> = batch.iter().map(|p| p.item.clone()).collect();
        let body = build_body(self.kind, &docs, &self.service, self.scope)?;

        match self.deliver(body).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let dropped = self.queue.requeue_bounded(batch);
                if dropped > 0 {
                    eprintln!(
                        "[LOGGER WARNING] HTTP transport dropped {} log entries beyond one batch of backlog",
                        dropped
                    );
                }
                Err(e)
            }
        }
    }

    async fn deliver(&self, body: String) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.post(body.clone()).await {
                Ok(()) => return Ok(()),
                Err(message) => match self.retry.delay_after(attempt) {
                    Some(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        return Err(LoggerError::delivery(
                            format!("{} ({})", self.url, self.kind.as_str()),
                            attempt,
                            message,
                        ))
                    }
                },
            }
        }
    }

    async fn post(&self, body: String) -> std::result::Result<(), String> {
        let response = self
            .client
            .post(self.url.clone())
            .headers(self.headers())
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("status {}", status))
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let Some(key) = &self.api_key else {
            return headers;
        };
        let (name, value) = match self.kind {
            ServiceKind::Datadog => ("DD-API-KEY", key.clone()),
            ServiceKind::Splunk => (AUTHORIZATION.as_str(), format!("Splunk {}", key)),
            _ => (AUTHORIZATION.as_str(), format!("Bearer {}", key)),
        };
        match (
            reqwest::header::HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => eprintln!("[LOGGER WARNING] HTTP transport API key is not a valid header value"),
        }
        headers
    }
}

/// Serialize a batch in the wire format the target service expects
pub fn build_body(
    kind: ServiceKind,
    docs: &[Value],
    service: &ServiceInfo,
    scope: Scope,
) -> Result<String> {
    let body = match kind {
        ServiceKind::Datadog => {
            let logs: Vec<Value> = docs
                .iter()
                .map(|doc| {
                    let mut log = Map::new();
                    log.insert("ddsource".into(), "rust".into());
                    log.insert("service".into(), service.name.clone().into());
                    if let Some(fields) = doc.as_object() {
                        for (k, v) in fields {
                            if k == "level" {
                                log.insert("status".into(), v.clone());
                            } else {
                                log.insert(k.clone(), v.clone());
                            }
                        }
                    }
                    Value::Object(log)
                })
                .collect();
            json!({
                "logs": logs,
                "attributes": {
                    "service": service.name,
                    "environment": service.environment,
                    "version": service.version,
                    "scope": scope.as_str(),
                },
            })
            .to_string()
        }
        ServiceKind::Elasticsearch => {
            let mut out = String::new();
            for doc in docs {
                out.push_str("{\"index\":{}}\n");
                out.push_str(&serde_json::to_string(doc)?);
                out.push('\n');
            }
            out
        }
        ServiceKind::Splunk => {
            let mut lines = Vec::with_capacity(docs.len());
            for doc in docs {
                let time = doc
                    .get("timestamp")
                    .and_then(Value::as_str)
                    .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
                    .map(|ts| ts.timestamp_millis() as f64 / 1000.0)
                    .unwrap_or_default();
                lines.push(serde_json::to_string(&json!({ "time": time, "event": doc }))?);
            }
            lines.join("\n")
        }
        ServiceKind::Generic => json!({
            "logs": docs,
            "scope": scope.as_str(),
            "count": docs.len(),
            "service": service.name,
        })
        .to_string(),
    };
    Ok(body)
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn write(&self, entry: &LogEntry) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::TransportClosed("http".to_string()));
        }
        let doc = optimize_entry(entry, self.inner.options);
        if self.inner.queue.push(doc) >= self.inner.queue.batch_size() {
            self.inner.flush_batch().await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush_batch().await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let timer = self.timer.lock().take();
        if let Some(timer) = timer {
            timer.stop().await;
        }
        self.inner.flush_batch().await
    }
}
