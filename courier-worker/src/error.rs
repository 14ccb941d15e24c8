//! Error types for the worker
//!
//! Each failure class has its own type so that the executor can decide
//! per class whether a failure is per-task or aborts the batch.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a queue gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Task does not exist in the store
    #[error("Task not found: {0}")]
    NotFound(Uuid),

    /// Stored row could not be mapped to a task
    #[error("Corrupt task record: {0}")]
    Corrupt(String),

    /// Backing store is unreachable or refused the call
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a transport gateway for a single send
#[derive(Debug, Error)]
pub enum TransportError {
    /// Relay rejected the message
    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Errors that end a batch attempt early
///
/// These never escape the job loop controller; it logs them and keeps
/// running.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Queue gateway failed while fetching or recording status
    #[error("Queue gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Batch task panicked or was aborted
    #[error("Batch task did not complete: {0}")]
    Panicked(String),
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                GatewayError::Unavailable(err.to_string())
            }
            other => GatewayError::Database(other),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_converts_into_batch_error() {
        let id = Uuid::new_v4();
        let err: BatchError = GatewayError::NotFound(id).into();
        assert!(matches!(err, BatchError::Gateway(GatewayError::NotFound(got)) if got == id));
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_pool_exhaustion_is_unavailable() {
        let err: GatewayError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, GatewayError::Unavailable(_)));

        let err: GatewayError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, GatewayError::Database(_)));
    }
}
