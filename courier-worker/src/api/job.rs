//! Job Loop API Handlers
//!
//! The trigger is fire-and-forget: it always answers 202 and leaves
//! admission (single-flight, shutdown) to the controller.

use axum::{Json, extract::State, http::StatusCode};
use courier_core::dto::status::{LoopStatus, TriggerResponse};

use crate::api::AppState;
use crate::scheduler::StartOutcome;

/// GET /email-job/trigger
/// Start the email processing loop unless it is already running
pub async fn trigger_job_loop(State(state): State<AppState>) -> (StatusCode, Json<TriggerResponse>) {
    tracing::info!("Manual trigger of email job processing requested.");

    let run = state.controller.start();
    tokio::spawn(async move {
        if let StartOutcome::Completed {
            report: None,
            rescheduled,
        } = run.await
        {
            tracing::warn!("Triggered batch failed (next run scheduled: {})", rescheduled);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            message: "Email job processing triggered.".to_string(),
        }),
    )
}

/// GET /email-job/status
pub async fn job_loop_status(State(state): State<AppState>) -> Json<LoopStatus> {
    Json(state.controller.status())
}
