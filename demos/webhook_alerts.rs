//! Rate-limited webhook alerting
//!
//! Sends error entries to `LOG_WEBHOOK_URL` (a Slack incoming webhook works),
//! at most 3 per minute. Without the variable a local URL is used and the
//! failed deliveries are reported on stderr.
//!
//! Run with: LOG_WEBHOOK_URL=https://hooks.slack.com/... cargo run --example webhook_alerts

use log_pipeline::core::{FileConfig, WebhookConfig};
use log_pipeline::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Log Pipeline - Webhook Alerts Example ===\n");

    let url = std::env::var("LOG_WEBHOOK_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:9/alerts".to_string());

    let config = LoggerConfig {
        file: FileConfig {
            enabled: false,
            ..FileConfig::default()
        },
        webhook: Some(WebhookConfig {
            rate_limit: 3,
            rate_window: Duration::from_secs(60),
            ..WebhookConfig::new(url)
        }),
        ..LoggerConfig::default()
    };
    let logger = Logger::from_config(&config).await?;

    // Below the webhook threshold: console only
    logger.warn("Disk at 80%");

    for i in 1..=5 {
        logger.error_with_context(
            format!("Payment failed #{}", i),
            LogContext::new()
                .with_field("component", "billing")
                .with_field("orderId", format!("ord-{}", 1000 + i)),
        );
    }

    logger.close().await;
    println!(
        "\nAlerts beyond the rate limit are dropped: {} dropped",
        logger.dropped_count()
    );
    Ok(())
}
