//! Shutdown coordinator
//!
//! Phase 1 (`notice`) only records that shutdown has begun. Phase 2
//! (`commit`) stops admission on the job loop and blocks until the in-flight
//! batch resolves or `drain_timeout` elapses. Phase 2 never fails: every
//! outcome is logged and returned, and the caller proceeds to exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::scheduler::{DrainOutcome, JobLoopController};

pub struct ShutdownCoordinator {
    controller: Arc<JobLoopController>,
    drain_timeout: Duration,
    begun: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(controller: Arc<JobLoopController>, drain_timeout: Duration) -> Self {
        Self {
            controller,
            drain_timeout,
            begun: AtomicBool::new(false),
        }
    }

    /// Phase 1: records that shutdown has begun. Never blocks.
    pub fn notice(&self) {
        if !self.begun.swap(true, Ordering::SeqCst) {
            info!("[Graceful Shutdown] Shutdown notice received");
        }
    }

    /// Whether either phase has been entered
    #[allow(dead_code)]
    pub fn has_begun(&self) -> bool {
        self.begun.load(Ordering::SeqCst)
    }

    /// Phase 2: stops admission and drains the in-flight batch
    pub async fn commit(&self, signal: Option<&str>) -> DrainOutcome {
        warn!(
            "[Graceful Shutdown] Received {}. Preparing job loop to shut down...",
            signal.unwrap_or("shutdown signal")
        );
        self.begun.store(true, Ordering::SeqCst);
        self.controller.request_shutdown();

        if self.controller.is_processing() {
            info!(
                "[Graceful Shutdown] A batch is currently processing. Waiting up to {:?} for it to complete...",
                self.drain_timeout
            );
        }

        let outcome = self.controller.await_drain(self.drain_timeout).await;

        match outcome {
            DrainOutcome::Idle => {
                info!("[Graceful Shutdown] No batch was actively processing.");
            }
            DrainOutcome::Drained => {
                info!("[Graceful Shutdown] Current batch has finished.");
            }
            DrainOutcome::TimedOut => {
                error!(
                    "[Graceful Shutdown] Drain timeout of {:?} exceeded. Exiting with a batch still in flight; \
                     its unfinished tasks stay leased until the lease expires.",
                    self.drain_timeout
                );
            }
        }

        warn!("[Graceful Shutdown] Job loop has finished its shutdown preparations.");
        outcome
    }
}
