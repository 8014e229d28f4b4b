//! Rule Cache - A TTL cache for precomputed decision-support rules
//!
//! Hosts a rule cache over the in-memory store, optionally warmed from a JSON
//! seed file, with the background reaper running until shutdown.

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rule_cache::{spawn_reaper_task, Config, MemoryEntryStore, RuleCacheService, StaticProducer};

/// Main entry point for the rule cache.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Load seed rules, if a seed file is configured
/// 4. Create the service and warm it with the seed rules
/// 5. Start the background reaper task
/// 6. Wait for SIGINT/SIGTERM and log final statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rule_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rule cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: sweep_interval={}s, grace_period={}s, compute_timeout={}ms, compute_mode={:?}",
        config.sweep_interval, config.grace_period, config.compute_timeout_ms, config.compute_mode
    );

    let producer = match &config.seed_file {
        Some(path) => StaticProducer::from_seed_file(path)
            .with_context(|| format!("loading seed rules from {}", path))?,
        None => StaticProducer::new(),
    };
    info!("Loaded {} seed rules", producer.len());

    let seeds: Vec<_> = producer
        .rules()
        .map(|(id, computed)| (id.clone(), computed.clone()))
        .collect();

    let service = RuleCacheService::from_config(MemoryEntryStore::new(), producer, &config);

    for (id, computed) in seeds {
        service
            .put(&id.rule_type, &id.key, computed.payload, computed.ttl)
            .await
            .with_context(|| format!("warming {}", id))?;
    }
    info!("Rule cache initialized");

    let reaper = spawn_reaper_task(service.clone(), config.sweep_interval());
    info!("Background reaper task started");

    shutdown_signal().await;

    reaper.abort();
    warn!("Reaper task aborted");

    let stats = service.stats().await?;
    info!(
        "Final stats: hits={}, misses={}, computations={}, reaped={}, entries={}",
        stats.hits, stats.misses, stats.computations, stats.reaped, stats.total_entries
    );

    info!("Rule cache shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
