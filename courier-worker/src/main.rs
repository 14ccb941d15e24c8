//! Courier Worker
//!
//! Email delivery worker built around a single-flight polling job loop.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repositories: Queue gateway (Postgres or in-memory) and mail transport
//! - Services: Batch executor (fetch, send one at a time, record status)
//! - Scheduler: Job loop controller (admission, in-flight handle, polling)
//! - Shutdown: Two-phase coordinator that drains the in-flight batch
//! - API: HTTP trigger, status and task intake
//!
//! On SIGINT/SIGTERM the worker stops admitting batches, waits (bounded) for
//! the current batch to reach a task boundary, then stops the HTTP server.

mod api;
mod config;
mod db;
mod error;
mod repository;
mod scheduler;
mod service;
mod shutdown;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::repository::{InMemoryQueue, PgQueue, QueueGateway, SimulatedTransport, TransportGateway};
use crate::scheduler::JobLoopController;
use crate::service::BatchExecutor;
use crate::shutdown::ShutdownCoordinator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_worker=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Courier Worker");

    let config = load_config()?;
    info!(
        "Loaded configuration: batch_size={}, poll_interval={:?}, drain_timeout={:?}",
        config.batch_size, config.poll_interval, config.drain_timeout
    );

    let queue = build_queue(&config).await?;
    let transport: Arc<dyn TransportGateway> =
        Arc::new(SimulatedTransport::new(config.send_latency));

    let executor = Arc::new(BatchExecutor::new(queue.clone(), transport));
    let controller = Arc::new(JobLoopController::new(
        executor,
        config.batch_size,
        config.poll_interval,
    ));
    let coordinator = ShutdownCoordinator::new(controller.clone(), config.drain_timeout);

    let app = api::create_router(AppState {
        controller: controller.clone(),
        queue,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on {}", config.bind_addr);

    if config.autostart {
        info!("Autostart enabled; starting job loop");
        tokio::spawn(controller.start());
    }

    let server_stop = CancellationToken::new();
    let mut server = tokio::spawn({
        let stop = server_stop.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
        }
    });

    let signal = tokio::select! {
        name = shutdown::wait_for_signal() => Some(name),
        result = &mut server => {
            error!("HTTP server stopped unexpectedly: {:?}", result);
            None
        }
    };

    // The drain must finish before the process is allowed to exit.
    coordinator.notice();
    coordinator.commit(signal).await;

    if signal.is_some() {
        server_stop.cancel();
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("HTTP server error during shutdown: {}", e),
            Err(e) => error!("HTTP server task failed: {}", e),
        }
    }

    info!("Courier Worker stopped");
    exit_status(signal)
}

/// A stop without a signal means the HTTP server died, which is a failure
/// even after a clean drain
fn exit_status(signal: Option<&str>) -> Result<()> {
    match signal {
        Some(_) => Ok(()),
        None => anyhow::bail!("HTTP server stopped unexpectedly"),
    }
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Picks the queue backing store: Postgres when configured, memory otherwise
async fn build_queue(config: &Config) -> Result<Arc<dyn QueueGateway>> {
    match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let pool = db::create_pool(url)
                .await
                .context("Failed to create database pool")?;

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Ok(Arc::new(PgQueue::new(pool, config.lease_duration)))
        }
        None => {
            info!("DATABASE_URL not set; using in-memory queue");
            Ok(Arc::new(InMemoryQueue::new(config.lease_duration)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_stop_exits_cleanly() {
        assert!(exit_status(Some("SIGTERM")).is_ok());
        assert!(exit_status(Some("SIGINT")).is_ok());
    }

    #[test]
    fn test_server_death_exits_with_error() {
        let err = exit_status(None).unwrap_err();
        assert!(err.to_string().contains("stopped unexpectedly"));
    }
}
