//! Job loop DTOs

use serde::{Deserialize, Serialize};

/// Response returned by the trigger endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub message: String,
}

/// Snapshot of the job loop, as exposed over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStatus {
    /// Shutdown has been requested; no new batch will be admitted
    pub shutting_down: bool,

    /// A batch is currently in flight
    pub processing_batch: bool,

    /// Number of batches that have resolved since start
    pub batches_completed: u64,
}
