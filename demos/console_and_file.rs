//! Console and rotating file delivery
//!
//! Logs to the terminal and to JSON lines under `./demo-logs`, rotating when
//! the active file passes 4 KB.
//!
//! Run with: cargo run --example console_and_file

use log_pipeline::core::{ConsoleConfig, FileConfig};
use log_pipeline::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Log Pipeline - Console and File Example ===\n");

    let config = LoggerConfig {
        level: LogLevel::Debug,
        console: ConsoleConfig {
            format: ConsoleFormat::Pretty,
            ..ConsoleConfig::default()
        },
        file: FileConfig {
            directory: "demo-logs".into(),
            filename: "demo".to_string(),
            max_size: 4 * 1024,
            ..FileConfig::default()
        },
        ..LoggerConfig::default()
    };
    let logger = Logger::from_config(&config).await?;
    println!("Active transports: {:?}\n", logger.transport_names());

    logger.debug("Cache warmed");
    logger.info_with_context(
        "Server listening",
        LogContext::new()
            .with_field("component", "server")
            .with_field("port", 8080),
    );

    let requests = logger.child(LogContext::new().with_field("component", "api"));
    for i in 0..50 {
        requests.info_with_context(
            format!("GET /orders/{}", i),
            LogContext::new()
                .with_field("requestId", format!("req-{}", i))
                .with_field("statusCode", 200)
                .with_field("duration", 12.5 + i as f64),
        );
    }
    requests.warn_with_context("Slow query", LogContext::new().with_field("duration", 1250));
    logger.error_with_context("DB down", LogContext::new().with_field("component", "db"));

    logger.close().await;

    let metrics = logger.metrics();
    println!(
        "\nLogged {} entries, dropped {}. Files are in ./demo-logs",
        metrics.total_logged(),
        metrics.dropped_count()
    );
    Ok(())
}
