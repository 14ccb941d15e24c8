//! In-memory queue
//!
//! Used when no database is configured, and as the backing store for
//! tests. Leases are measured with `tokio::time::Instant` so paused-clock
//! tests can move them forward.

use async_trait::async_trait;
use courier_core::domain::task::{Task, TaskStatus};
use courier_core::dto::task::EnqueueTask;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::repository::QueueGateway;

struct Entry {
    task: Task,
    leased_until: Option<Instant>,
    times_fetched: u32,
}

impl Entry {
    fn is_visible(&self, now: Instant) -> bool {
        if self.leased_until.is_some_and(|until| until > now) {
            return false;
        }
        // A task stuck in SENDING with an expired lease belongs to a worker
        // that died mid-send.
        self.task.status.is_fetchable() || self.task.status == TaskStatus::Sending
    }
}

/// Ordered, mutex-protected task store
pub struct InMemoryQueue {
    entries: Mutex<Vec<Entry>>,
    lease_duration: Duration,
}

impl InMemoryQueue {
    /// Creates an empty queue with the given lease duration
    pub fn new(lease_duration: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            lease_duration,
        }
    }

    /// Creates a queue pre-filled with tasks, in order
    #[allow(dead_code)]
    pub fn with_tasks(lease_duration: Duration, tasks: Vec<Task>) -> Self {
        let queue = Self::new(lease_duration);
        {
            let mut entries = queue.lock();
            entries.extend(tasks.into_iter().map(|task| Entry {
                task,
                leased_until: None,
                times_fetched: 0,
            }));
        }
        queue
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl QueueGateway for InMemoryQueue {
    async fn fetch_batch(&self, limit: usize) -> GatewayResult<Vec<Task>> {
        let now = Instant::now();
        let lease_until = now + self.lease_duration;
        let mut entries = self.lock();

        let batch: Vec<Task> = entries
            .iter_mut()
            .filter(|e| e.is_visible(now))
            .take(limit)
            .map(|e| {
                if e.times_fetched > 0 {
                    e.task.status = TaskStatus::RetryPending;
                }
                e.times_fetched += 1;
                e.leased_until = Some(lease_until);
                e.task.clone()
            })
            .collect();

        debug!("Leased {} task(s) from memory queue", batch.len());
        Ok(batch)
    }

    async fn mark_status(&self, id: Uuid, status: TaskStatus) -> GatewayResult<()> {
        let mut entries = self.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.task.id == id)
            .ok_or(GatewayError::NotFound(id))?;

        entry.task.status = status;
        if status.is_terminal() {
            entry.leased_until = None;
        }
        Ok(())
    }

    async fn release(&self, ids: &[Uuid]) -> GatewayResult<()> {
        let mut entries = self.lock();
        for entry in entries.iter_mut().filter(|e| ids.contains(&e.task.id)) {
            entry.leased_until = None;
        }
        Ok(())
    }

    async fn enqueue(&self, req: EnqueueTask) -> GatewayResult<Task> {
        let task = Task::from(req);
        self.lock().push(Entry {
            task: task.clone(),
            leased_until: None,
            times_fetched: 0,
        });
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> GatewayResult<Option<Task>> {
        Ok(self
            .lock()
            .iter()
            .find(|e| e.task.id == id)
            .map(|e| e.task.clone()))
    }
}
