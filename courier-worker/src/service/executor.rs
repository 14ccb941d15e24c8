//! Batch executor
//!
//! Fetches one batch of tasks and sends them one at a time, in fetch order.
//!
//! Shutdown is observed through a `CancellationToken` at two points only:
//! right after the fetch, and before each task. A send that has already
//! started is never interrupted. The tasks sent are therefore exactly the
//! prefix processed before cancellation was seen; everything after that
//! point is released back to the queue untouched.

use courier_core::domain::task::{Task, TaskStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{BatchError, GatewayError};
use crate::repository::{QueueGateway, TransportGateway};

/// Outcome of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Tasks returned by the fetch
    pub fetched: usize,
    /// Tasks that reached SENT
    pub sent: usize,
    /// Tasks that reached FAILED
    pub failed: usize,
    /// Tasks left untouched and released for a later batch
    pub untouched: usize,
    /// Shutdown was already requested when the fetch returned
    pub abandoned: bool,
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} fetched, {} sent, {} failed, {} untouched",
            self.fetched, self.sent, self.failed, self.untouched
        )?;
        if self.abandoned {
            f.write_str(" (abandoned)")?;
        }
        Ok(())
    }
}

pub struct BatchExecutor {
    queue: Arc<dyn QueueGateway>,
    transport: Arc<dyn TransportGateway>,
}

impl BatchExecutor {
    pub fn new(queue: Arc<dyn QueueGateway>, transport: Arc<dyn TransportGateway>) -> Self {
        Self { queue, transport }
    }

    /// Runs a single batch of at most `fetch_limit` tasks
    ///
    /// Transport failures are recorded per task and never end the batch.
    /// Queue gateway failures end the batch with `BatchError::Gateway`.
    pub async fn run(
        &self,
        fetch_limit: usize,
        shutdown: &CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        debug!("Fetching up to {} task(s)", fetch_limit);
        let tasks = self.queue.fetch_batch(fetch_limit).await?;

        let mut report = BatchReport {
            fetched: tasks.len(),
            ..BatchReport::default()
        };

        if shutdown.is_cancelled() && !tasks.is_empty() {
            info!(
                "Shutdown initiated. Releasing {} fetched task(s) without sending",
                tasks.len()
            );
            report.abandoned = true;
            report.untouched = tasks.len();
            self.release(&tasks).await;
            return Ok(report);
        }

        if tasks.is_empty() {
            info!("No tasks in queue for this batch");
            return Ok(report);
        }

        info!("Processing {} task(s)...", tasks.len());

        for (idx, task) in tasks.iter().enumerate() {
            if shutdown.is_cancelled() {
                let remaining = &tasks[idx..];
                warn!(
                    "Shutdown during batch. Task {} and {} after it not sent; releasing for retry",
                    task.id,
                    remaining.len() - 1
                );
                report.untouched = remaining.len();
                self.release(remaining).await;
                break;
            }

            match self.send_and_record(task).await {
                Ok(TaskStatus::Sent) => report.sent += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    // The failing task keeps its lease; the rest were never touched.
                    let remaining = &tasks[idx + 1..];
                    if !remaining.is_empty() {
                        warn!(
                            "Queue gateway failed on task {}; releasing {} remaining task(s)",
                            task.id,
                            remaining.len()
                        );
                        self.release(remaining).await;
                    }
                    return Err(e.into());
                }
            }
        }

        info!("Finished email batch: {}", report);
        Ok(report)
    }

    /// Sends one task and records its terminal status
    async fn send_and_record(&self, task: &Task) -> Result<TaskStatus, GatewayError> {
        info!("Attempting to send task {} to {}", task.id, task.recipient);

        self.queue.mark_status(task.id, TaskStatus::Sending).await?;

        let status = match self.transport.send(task).await {
            Ok(()) => {
                info!("Successfully sent task {}", task.id);
                TaskStatus::Sent
            }
            Err(e) => {
                error!("Failed to send task {}: {}", task.id, e);
                TaskStatus::Failed
            }
        };

        self.queue.mark_status(task.id, status).await?;
        Ok(status)
    }

    /// Best effort; an unreleased task still returns once its lease expires
    async fn release(&self, tasks: &[Task]) {
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        if let Err(e) = self.queue.release(&ids).await {
            warn!("Failed to release {} task(s): {}", ids.len(), e);
        }
    }
}
