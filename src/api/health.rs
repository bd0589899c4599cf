use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::tasks::TaskStore;

#[derive(Clone)]
pub struct HealthState {
    pub store: TaskStore,
    pub cache_enabled: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service can reach its task store.
    pub healthy: bool,
    /// Whether the directions cache is configured.
    pub cache_enabled: bool,
    pub pending_tasks: i64,
    pub processing_tasks: i64,
    pub completed_tasks: i64,
    pub failed_tasks: i64,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let mut response = HealthResponse {
        healthy: false,
        cache_enabled: state.cache_enabled,
        pending_tasks: 0,
        processing_tasks: 0,
        completed_tasks: 0,
        failed_tasks: 0,
    };

    match state.store.counts_by_status().await {
        Ok(counts) => {
            response.healthy = true;
            for (status, count) in counts {
                match status.as_str() {
                    "PENDING" => response.pending_tasks = count,
                    "PROCESSING" => response.processing_tasks = count,
                    "COMPLETED" => response.completed_tasks = count,
                    "FAILED" => response.failed_tasks = count,
                    _ => {}
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the task store");
        }
    }

    Json(response)
}

pub fn router(store: TaskStore, cache_enabled: bool) -> Router {
    let state = HealthState {
        store,
        cache_enabled,
    };
    Router::new()
        .route("/", get(health_check))
        .with_state(state)
}
