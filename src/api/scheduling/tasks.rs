use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::SchedulingState;
use crate::api::{bad_request, internal_error, not_found, ErrorResponse};
use crate::models::{SchedulingRequest, SchedulingResponse};
use crate::tasks::TaskStatus;

#[derive(Debug, Serialize, ToSchema)]
pub struct EnqueueResponse {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskStatusResponse {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SchedulingResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Enqueue a scheduling request for asynchronous processing
#[utoipa::path(
    post,
    path = "/v1_webapp_auto_scheduling/enqueue",
    request_body = SchedulingRequest,
    responses(
        (status = 201, description = "Task accepted", body = EnqueueResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 403, description = "Origin not allowed", body = ErrorResponse),
        (status = 500, description = "Task could not be persisted", body = ErrorResponse)
    ),
    tag = "scheduling"
)]
pub async fn enqueue(
    State(state): State<SchedulingState>,
    payload: Result<Json<SchedulingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EnqueueResponse>), (StatusCode, Json<ErrorResponse>)> {
    let Json(request) = payload.map_err(bad_request)?;

    match state.store.create_task(&request).await {
        Ok(task_id) => {
            tracing::info!(task_id = %task_id, "Enqueued scheduling task");
            Ok((StatusCode::CREATED, Json(EnqueueResponse { task_id })))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to enqueue scheduling task");
            Err(internal_error(e))
        }
    }
}

/// Fetch the status and result of an enqueued task
#[utoipa::path(
    get,
    path = "/v1_webapp_auto_scheduling/{task_id}",
    params(("task_id" = String, Path, description = "Task id returned by enqueue")),
    responses(
        (status = 200, description = "Task status, with result or error when finished", body = TaskStatusResponse),
        (status = 403, description = "Origin not allowed", body = ErrorResponse),
        (status = 404, description = "Unknown task id", body = ErrorResponse),
        (status = 500, description = "Task store unavailable", body = ErrorResponse)
    ),
    tag = "scheduling"
)]
pub async fn get_task(
    State(state): State<SchedulingState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.get_task(&task_id).await {
        Ok(Some(record)) => {
            let result = record
                .response_body
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(internal_error)?;
            Ok(Json(TaskStatusResponse {
                task_id: record.task_id,
                status: record.status,
                result,
                error: record.error_message,
            }))
        }
        Ok(None) => Err(not_found(format!("Task {task_id} not found"))),
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to load task");
            Err(internal_error(e))
        }
    }
}
