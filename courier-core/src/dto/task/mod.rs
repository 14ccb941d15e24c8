//! Task DTOs

use serde::{Deserialize, Serialize};

use crate::domain::task::Task;

/// Request to add a new email to the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueTask {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl From<EnqueueTask> for Task {
    fn from(req: EnqueueTask) -> Self {
        Task::new(req.recipient, req.subject, req.body)
    }
}
