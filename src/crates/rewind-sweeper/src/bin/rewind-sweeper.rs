//! Durability sweeper binary
//!
//! Standalone process that periodically dumps the durable store and the fast
//! cache to long-term storage, advancing the last-known-good marker on each
//! complete snapshot set.

use clap::Parser;
use rewind_sweeper::{DirDump, Sweeper, SweeperConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing/logging
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .init();

    let config = SweeperConfig::parse();

    // Log configuration summary
    tracing::info!("Durable target: {}", config.durable_target.display());
    tracing::info!("Cache target: {}", config.cache_target.display());
    tracing::info!("Output root: {}", config.output_root.display());
    tracing::info!("Sweep interval: {}s", config.interval_secs);
    tracing::info!("Step timeout: {}s", config.step_timeout_secs);
    tracing::info!("Retained sets: {}", config.retain_sets);

    let durable = Arc::new(DirDump::new("durable-store", &config.durable_target));
    let cache = Arc::new(DirDump::new("cache", &config.cache_target));

    let sweeper = Sweeper::new(durable, cache, &config.output_root)
        .with_interval(Duration::from_secs(config.interval_secs))
        .with_step_timeout(Duration::from_secs(config.step_timeout_secs))
        .with_retention(config.retain_sets);

    if let Some(lkg) = sweeper.last_known_good() {
        tracing::info!("Resuming; last-known-good is {}", lkg.display());
    }

    // Run until Ctrl-C or SIGTERM
    tokio::select! {
        _ = sweeper.run() => {}
        _ = shutdown_signal() => {
            tracing::info!("Sweeper shut down gracefully");
        }
    }

    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down");
        }
    }
}
