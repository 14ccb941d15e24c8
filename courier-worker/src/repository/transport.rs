//! Transport gateway
//!
//! Hands a single email to the mail relay. A send that has started is
//! always allowed to finish; callers never cancel one midway.

use async_trait::async_trait;
use courier_core::domain::task::Task;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;

#[async_trait]
pub trait TransportGateway: Send + Sync {
    /// Delivers one task
    async fn send(&self, task: &Task) -> Result<(), TransportError>;
}

/// Stand-in relay that only spends time
///
/// Recipients under the reserved `.invalid` TLD are rejected, so failure
/// handling can be exercised end to end without a real relay.
pub struct SimulatedTransport {
    latency: Duration,
}

impl SimulatedTransport {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TransportGateway for SimulatedTransport {
    async fn send(&self, task: &Task) -> Result<(), TransportError> {
        debug!("Simulating delivery of {} to {}", task.id, task.recipient);
        tokio::time::sleep(self.latency).await;

        if task.recipient.ends_with(".invalid") {
            return Err(TransportError::Rejected(format!(
                "no such domain for {}",
                task.recipient
            )));
        }
        Ok(())
    }
}
