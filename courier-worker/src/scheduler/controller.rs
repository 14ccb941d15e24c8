//! Job loop controller
//!
//! Owns the single-flight state of the email job loop.
//!
//! `start()` admits a batch only when none is in flight and shutdown has not
//! been requested. The admitted batch runs on its own task; when it resolves
//! and shutdown is still not requested, the next run is scheduled after
//! `poll_interval`. A loop that sees shutdown simply does not reschedule.
//!
//! Admission is a check-and-set under one lock, so concurrent triggers can
//! never create two batches.

use courier_core::dto::status::LoopStatus;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::BatchError;
use crate::service::{BatchExecutor, BatchReport};

/// Result of a call to [`JobLoopController::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Another batch was in flight; nothing was started
    AlreadyRunning,
    /// Shutdown was requested; nothing was started
    ShuttingDown,
    /// A batch ran. `report` is `None` when the batch failed.
    Completed {
        report: Option<BatchReport>,
        rescheduled: bool,
    },
}

/// Result of waiting for the in-flight batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// No batch was in flight
    Idle,
    /// The in-flight batch resolved within the bound
    Drained,
    /// The bound elapsed first
    TimedOut,
}

pub type StartFuture = Pin<Box<dyn Future<Output = StartOutcome> + Send + 'static>>;

/// Awaitable view of the in-flight batch
#[derive(Clone)]
struct BatchHandle {
    done: watch::Receiver<bool>,
}

impl BatchHandle {
    async fn wait(mut self) {
        if self.done.wait_for(|done| *done).await.is_err() {
            debug!("Batch handle closed without completion signal");
        }
    }
}

#[derive(Default)]
struct LoopState {
    /// `Some` exactly while a batch is in flight
    current_batch: Option<BatchHandle>,
    batches_completed: u64,
}

pub struct JobLoopController {
    executor: Arc<BatchExecutor>,
    shutdown: CancellationToken,
    state: Mutex<LoopState>,
    batch_size: usize,
    poll_interval: Duration,
}

impl JobLoopController {
    pub fn new(executor: Arc<BatchExecutor>, batch_size: usize, poll_interval: Duration) -> Self {
        Self {
            executor,
            shutdown: CancellationToken::new(),
            state: Mutex::new(LoopState::default()),
            batch_size,
            poll_interval,
        }
    }

    /// Runs one batch if admitted, then schedules the next run
    ///
    /// The returned future resolves when the batch does. Dropping it does
    /// not cancel the batch.
    pub fn start(self: &Arc<Self>) -> StartFuture {
        let this = Arc::clone(self);
        Box::pin(async move { this.run_cycle().await })
    }

    /// Stops admission of new batches. Idempotent.
    pub fn request_shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Shutdown requested; no new batches will be admitted");
        }
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn is_processing(&self) -> bool {
        self.lock_state().current_batch.is_some()
    }

    pub fn status(&self) -> LoopStatus {
        let state = self.lock_state();
        LoopStatus {
            shutting_down: self.is_shutting_down(),
            processing_batch: state.current_batch.is_some(),
            batches_completed: state.batches_completed,
        }
    }

    /// Waits for the in-flight batch, if any, for at most `timeout`
    pub async fn await_drain(&self, timeout: Duration) -> DrainOutcome {
        let handle = self.lock_state().current_batch.clone();
        let Some(handle) = handle else {
            return DrainOutcome::Idle;
        };

        match tokio::time::timeout(timeout, handle.wait()).await {
            Ok(()) => DrainOutcome::Drained,
            Err(_) => DrainOutcome::TimedOut,
        }
    }

    async fn run_cycle(self: Arc<Self>) -> StartOutcome {
        let guard = match self.admit() {
            Ok(guard) => guard,
            Err(outcome) => return outcome,
        };

        info!("Starting a new email processing batch...");

        let executor = Arc::clone(&self.executor);
        let shutdown = self.shutdown.clone();
        let limit = self.batch_size;

        // The guard travels with the batch so the state is cleared when the
        // batch ends, even if this future is dropped or the batch panics.
        let batch = tokio::spawn(async move {
            let _guard = guard;
            executor.run(limit, &shutdown).await
        });

        let result = match batch.await {
            Ok(result) => result,
            Err(e) => Err(BatchError::Panicked(e.to_string())),
        };

        let report = match result {
            Ok(report) => {
                debug!("Batch resolved: {}", report);
                Some(report)
            }
            Err(e) => {
                error!("Error during email processing batch: {}", e);
                None
            }
        };

        let rescheduled = !self.is_shutting_down();
        if rescheduled {
            self.schedule_next();
        } else {
            info!("Shutdown requested; job loop will not reschedule");
        }

        StartOutcome::Completed {
            report,
            rescheduled,
        }
    }

    fn admit(self: &Arc<Self>) -> Result<InFlightGuard, StartOutcome> {
        let mut state = self.lock_state();

        if state.current_batch.is_some() {
            warn!("Email processing is already in progress. Skipping this run.");
            return Err(StartOutcome::AlreadyRunning);
        }

        if self.is_shutting_down() {
            info!("Shutdown initiated, not starting new email processing batch.");
            return Err(StartOutcome::ShuttingDown);
        }

        let (done, rx) = watch::channel(false);
        state.current_batch = Some(BatchHandle { done: rx });

        Ok(InFlightGuard {
            controller: Arc::clone(self),
            done,
        })
    }

    fn schedule_next(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let delay = self.poll_interval;
        debug!("Next batch in {:?}", delay);

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    this.start().await;
                }
                _ = this.shutdown.cancelled() => {
                    debug!("Shutdown requested; scheduled batch dropped");
                }
            }
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, LoopState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the in-flight slot and wakes drain waiters when dropped
struct InFlightGuard {
    controller: Arc<JobLoopController>,
    done: watch::Sender<bool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        {
            let mut state = self.controller.lock_state();
            state.current_batch = None;
            state.batches_completed += 1;
        }
        self.done.send_replace(true);
    }
}
