//! PostgreSQL queue
//!
//! Durable queue gateway. Leasing uses `FOR UPDATE SKIP LOCKED` so several
//! workers can share one table without handing the same task out twice.

use async_trait::async_trait;
use courier_core::domain::task::{Task, TaskStatus};
use courier_core::dto::task::EnqueueTask;
use sqlx::PgPool;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::repository::QueueGateway;

pub struct PgQueue {
    pool: PgPool,
    lease_duration: Duration,
}

impl PgQueue {
    pub fn new(pool: PgPool, lease_duration: Duration) -> Self {
        Self {
            pool,
            lease_duration,
        }
    }
}

#[async_trait]
impl QueueGateway for PgQueue {
    async fn fetch_batch(&self, limit: usize) -> GatewayResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            WITH picked AS (
                SELECT id FROM email_tasks
                WHERE status IN ('PENDING', 'RETRY_PENDING', 'SENDING')
                  AND (leased_until IS NULL OR leased_until < NOW())
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE email_tasks t
            SET leased_until = NOW() + make_interval(secs => $2),
                status = CASE WHEN t.times_fetched > 0 THEN 'RETRY_PENDING' ELSE t.status END,
                times_fetched = t.times_fetched + 1,
                updated_at = NOW()
            FROM picked
            WHERE t.id = picked.id
            RETURNING t.id, t.recipient, t.subject, t.body, t.status, t.created_at
            "#,
        )
        .bind(limit as i64)
        .bind(self.lease_duration.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        // RETURNING carries no ordering guarantee
        let mut tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<GatewayResult<Vec<_>>>()?;
        tasks.sort_by_key(|t| t.created_at);

        debug!("Leased {} task(s) from email_tasks", tasks.len());
        Ok(tasks)
    }

    async fn mark_status(&self, id: Uuid, status: TaskStatus) -> GatewayResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE email_tasks
            SET status = $1,
                leased_until = CASE WHEN $2 THEN NULL ELSE leased_until END,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(status.is_terminal())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(id));
        }
        Ok(())
    }

    async fn release(&self, ids: &[Uuid]) -> GatewayResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query("UPDATE email_tasks SET leased_until = NULL, updated_at = NOW() WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn enqueue(&self, req: EnqueueTask) -> GatewayResult<Task> {
        let task = Task::from(req);

        sqlx::query(
            r#"
            INSERT INTO email_tasks (id, recipient, subject, body, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(task.id)
        .bind(&task.recipient)
        .bind(&task.subject)
        .bind(&task.body)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> GatewayResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, recipient, subject, body, status, created_at
            FROM email_tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Task::try_from).transpose()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    recipient: String,
    subject: String,
    body: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = GatewayError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TaskStatus>()
            .map_err(|e| GatewayError::Corrupt(format!("task {}: {}", row.id, e)))?;

        Ok(Task {
            id: row.id,
            recipient: row.recipient,
            subject: row.subject,
            body: row.body,
            status,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> TaskRow {
        TaskRow {
            id: Uuid::new_v4(),
            recipient: "a@example.com".to_string(),
            subject: "Your Daily Update".to_string(),
            body: "Hello there!".to_string(),
            status: status.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_row_maps_to_task() {
        let task = Task::try_from(row("RETRY_PENDING")).unwrap();
        assert_eq!(task.status, TaskStatus::RetryPending);
        assert_eq!(task.recipient, "a@example.com");
    }

    #[test]
    fn test_row_with_unknown_status_is_corrupt() {
        let err = Task::try_from(row("QUEUED")).unwrap_err();
        assert!(matches!(err, GatewayError::Corrupt(_)));
    }
}
