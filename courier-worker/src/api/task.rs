//! Task API Handlers
//!
//! Intake and lookup of queued emails.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use courier_core::domain::task::Task;
use courier_core::dto::task::EnqueueTask;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// POST /tasks
/// Queue a new email
pub async fn enqueue_task(
    State(state): State<AppState>,
    Json(req): Json<EnqueueTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    validate(&req)?;

    let task = state.queue.enqueue(req).await?;
    tracing::info!("Task queued: {} for {}", task.id, task.recipient);

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    tracing::debug!("Getting task: {}", id);

    let task = state
        .queue
        .get_task(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

    Ok(Json(task))
}

// =============================================================================
// Validation
// =============================================================================

fn validate(req: &EnqueueTask) -> ApiResult<()> {
    if req.recipient.trim().is_empty() {
        return Err(ApiError::BadRequest("recipient cannot be empty".to_string()));
    }
    if !req.recipient.contains('@') {
        return Err(ApiError::BadRequest(format!(
            "recipient '{}' is not an email address",
            req.recipient
        )));
    }
    Ok(())
}
