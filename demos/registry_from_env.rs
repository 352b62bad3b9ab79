//! Named loggers resolved from the environment
//!
//! Try it with different settings, for example:
//!
//! ```text
//! LOG_LEVEL=debug LOG_SCOPE=minimal cargo run --example registry_from_env
//! ```

use log_pipeline::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Log Pipeline - Registry Example ===\n");

    let registry = LoggingRegistry::from_env();
    let root = registry.root().await?;
    println!("Root level: {}", root.level());
    println!("Transports: {:?}\n", root.transport_names());

    let db = registry.get("database").await?;
    let auth = registry.get("auth").await?;

    root.info("Application started");
    db.warn_with_context(
        "Connection pool exhausted",
        LogContext::new().with_field("poolSize", 10),
    );
    auth.debug_with_context("Token refreshed", LogContext::new().with_field("userId", "user-42"));
    auth.error_with_context(
        "Login failed",
        LogContext::new()
            .with_field("userId", "user-42")
            .with_field("error", "invalid credentials"),
    );

    // Names are cached, so this is the same `{"logger": "database"}` child
    let again = registry.get("database").await?;
    again.info("Pool recovered");

    registry.reset().await;
    println!("\nRegistry closed; dropped {} entries", root.dropped_count());
    Ok(())
}
