//! API Module
//!
//! HTTP surface of the worker: the fire-and-forget trigger for the job
//! loop, a status probe, and task intake.

pub mod error;
pub mod health;
pub mod job;
pub mod task;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::repository::QueueGateway;
use crate::scheduler::JobLoopController;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<JobLoopController>,
    pub queue: Arc<dyn QueueGateway>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job loop endpoints
        .route("/email-job/trigger", get(job::trigger_job_loop))
        .route(
            "/email-job-graceful-shutdown/trigger",
            get(job::trigger_job_loop),
        )
        .route("/email-job/status", get(job::job_loop_status))
        // Task endpoints
        .route("/tasks", post(task::enqueue_task))
        .route("/tasks/{id}", get(task::get_task))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
