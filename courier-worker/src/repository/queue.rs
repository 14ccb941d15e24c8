//! Queue gateway
//!
//! Contract between the batch executor and the durable task store.
//!
//! Fetching is lease based: a fetched task stays invisible to other fetches
//! until it reaches a terminal status, its lease is released, or the lease
//! expires. A task handed out again after an earlier lease is reported as
//! `RETRY_PENDING`. This is what makes leaving a task untouched on shutdown
//! safe: it comes back on a later fetch.

use async_trait::async_trait;
use courier_core::domain::task::{Task, TaskStatus};
use courier_core::dto::task::EnqueueTask;
use uuid::Uuid;

use crate::error::GatewayResult;

#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// Fetches up to `limit` tasks in creation order and leases them
    async fn fetch_batch(&self, limit: usize) -> GatewayResult<Vec<Task>>;

    /// Records a status transition for a task
    ///
    /// Terminal statuses end the task's lease.
    async fn mark_status(&self, id: Uuid, status: TaskStatus) -> GatewayResult<()>;

    /// Ends the lease on tasks that were fetched but never touched
    ///
    /// Their status is left as it was. Unknown ids are ignored.
    async fn release(&self, ids: &[Uuid]) -> GatewayResult<()>;

    /// Adds a new pending task
    async fn enqueue(&self, req: EnqueueTask) -> GatewayResult<Task>;

    /// Looks up a single task
    async fn get_task(&self, id: Uuid) -> GatewayResult<Option<Task>>;
}
