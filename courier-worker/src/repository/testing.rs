//! Test doubles for the gateways

use async_trait::async_trait;
use courier_core::domain::task::{Task, TaskStatus};
use courier_core::dto::task::EnqueueTask;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult, TransportError};
use crate::repository::{InMemoryQueue, QueueGateway, TransportGateway};

type Hook = Box<dyn Fn() + Send + Sync>;
type TaskHook = Box<dyn Fn(&Task) + Send + Sync>;

/// Builds `n` pending tasks addressed to distinct recipients
pub fn tasks(n: usize) -> Vec<Task> {
    (1..=n)
        .map(|i| Task::new(format!("recipient{}@example.com", i), "Your Daily Update", "Hello there!"))
        .collect()
}

/// In-memory queue that records every call made against it
pub struct RecordingQueue {
    inner: InMemoryQueue,
    fetch_calls: AtomicUsize,
    marks: Mutex<Vec<(Uuid, TaskStatus)>>,
    released: Mutex<Vec<Uuid>>,
    fetch_delay: Duration,
    fail_fetch: bool,
    fail_mark: Option<(Uuid, TaskStatus)>,
    on_fetch: Option<Hook>,
}

impl RecordingQueue {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            inner: InMemoryQueue::with_tasks(Duration::from_secs(3600), tasks),
            fetch_calls: AtomicUsize::new(0),
            marks: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            fetch_delay: Duration::ZERO,
            fail_fetch: false,
            fail_mark: None,
            on_fetch: None,
        }
    }

    /// Every fetch suspends for `delay` before returning
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Every fetch fails with `GatewayError::Unavailable`
    pub fn failing(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Recording `status` for `id` fails with `GatewayError::Unavailable`
    pub fn failing_mark(mut self, id: Uuid, status: TaskStatus) -> Self {
        self.fail_mark = Some((id, status));
        self
    }

    /// Runs `hook` inside each fetch, after the tasks are leased
    pub fn on_fetch(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_fetch = Some(Box::new(hook));
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Every `mark_status` call, in order
    pub fn marks(&self) -> Vec<(Uuid, TaskStatus)> {
        self.marks.lock().unwrap().clone()
    }

    /// Last status recorded for `id`, if any was recorded
    pub fn last_mark(&self, id: Uuid) -> Option<TaskStatus> {
        self.marks()
            .into_iter()
            .rev()
            .find(|(task_id, _)| *task_id == id)
            .map(|(_, status)| status)
    }

    pub fn released(&self) -> Vec<Uuid> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueGateway for RecordingQueue {
    async fn fetch_batch(&self, limit: usize) -> GatewayResult<Vec<Task>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if self.fail_fetch {
            return Err(GatewayError::Unavailable("queue offline".to_string()));
        }
        let batch = self.inner.fetch_batch(limit).await?;
        if let Some(hook) = &self.on_fetch {
            hook();
        }
        Ok(batch)
    }

    async fn mark_status(&self, id: Uuid, status: TaskStatus) -> GatewayResult<()> {
        if self.fail_mark == Some((id, status)) {
            return Err(GatewayError::Unavailable("status write lost".to_string()));
        }
        self.marks.lock().unwrap().push((id, status));
        self.inner.mark_status(id, status).await
    }

    async fn release(&self, ids: &[Uuid]) -> GatewayResult<()> {
        self.released.lock().unwrap().extend_from_slice(ids);
        self.inner.release(ids).await
    }

    async fn enqueue(&self, req: EnqueueTask) -> GatewayResult<Task> {
        self.inner.enqueue(req).await
    }

    async fn get_task(&self, id: Uuid) -> GatewayResult<Option<Task>> {
        self.inner.get_task(id).await
    }
}

/// Transport with scripted latency, failures and per-send hooks
pub struct ScriptedTransport {
    latency: Duration,
    fail_ids: HashSet<Uuid>,
    panic_ids: HashSet<Uuid>,
    sent: Mutex<Vec<Uuid>>,
    after_send: Option<TaskHook>,
}

impl ScriptedTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_ids: HashSet::new(),
            panic_ids: HashSet::new(),
            sent: Mutex::new(Vec::new()),
            after_send: None,
        }
    }

    /// Sends for `id` fail with `TransportError::Rejected`
    pub fn failing_for(mut self, id: Uuid) -> Self {
        self.fail_ids.insert(id);
        self
    }

    /// Sends for `id` panic
    pub fn panicking_for(mut self, id: Uuid) -> Self {
        self.panic_ids.insert(id);
        self
    }

    /// Runs `hook` after each send attempt completes
    pub fn after_send(mut self, hook: impl Fn(&Task) + Send + Sync + 'static) -> Self {
        self.after_send = Some(Box::new(hook));
        self
    }

    /// Ids of every send attempt that reached the transport, in order
    pub fn attempts(&self) -> Vec<Uuid> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportGateway for ScriptedTransport {
    async fn send(&self, task: &Task) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(task.id);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.panic_ids.contains(&task.id) {
            panic!("transport blew up on {}", task.id);
        }
        let result = if self.fail_ids.contains(&task.id) {
            Err(TransportError::Rejected(format!("mailbox {} unavailable", task.recipient)))
        } else {
            Ok(())
        };
        if let Some(hook) = &self.after_send {
            hook(task);
        }
        result
    }
}
