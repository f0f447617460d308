//! Example demonstrating layered sources, modules and hot refresh.
//!
//! This example shows how to:
//! - Layer a base file and its `dev` overlay
//! - Add configuration from a registered module
//! - Subscribe to changes and refresh automatically when files change
//!
//! Run with: RUST_LOG=configr=debug cargo run --example layered_sources

use configr::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct AppConfig {
    server: ServerConfig,
    features: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    port: u16,
    host: String,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("configr=info")),
        )
        .init();

    println!("=== Layered Sources Example ===\n");

    let dir = tempfile::tempdir()?;
    let base = dir.path().join("app.yaml");
    std::fs::write(&base, "server:\n  port: 8080\n  host: localhost\n")?;
    std::fs::write(dir.path().join("app.dev.yaml"), "server:\n  port: 3000\n")?;

    let modules = ModuleRegistry::new().with_fn("feature-flags", |args| {
        Ok(json!({"features": {"beta": args.modifiers.iter().any(|m| m == "dev")}}))
    });

    let aggregator = Arc::new(
        Aggregator::builder()
            .with_baseline(Baseline::Empty)
            .with_modules(modules)
            .with_source(
                SourceDescriptor::new(base.to_string_lossy()).with_modifiers(["dev"]),
            )
            .build()
            .await?,
    );
    aggregator
        .add_source(SourceDescriptor::module("feature-flags").with_modifiers(["dev"]))
        .await?;

    println!("Sources:\n{}\n", aggregator);
    let config: AppConfig = aggregator.try_deserialize()?;
    println!(
        "Server: {}:{} (features: {})",
        config.server.host, config.server.port, config.features
    );

    let refreshes = Arc::new(AtomicUsize::new(0));
    let refreshes_clone = Arc::clone(&refreshes);
    let _subscription = aggregator.subscribe(move |config| {
        let count = refreshes_clone.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[Event] configuration refreshed (#{}): port={}", count, config["server"]["port"]);
    });

    let _watch = aggregator.watch(Duration::from_millis(200))?;

    println!("\nEditing the dev overlay...");
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(dir.path().join("app.dev.yaml"), "server:\n  port: 4000\n")?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    println!(
        "\nport is now {} after {} refresh(es)",
        aggregator.config()["server"]["port"],
        refreshes.load(Ordering::SeqCst)
    );
    Ok(())
}
