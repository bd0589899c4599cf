use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::SchedulingState;
use crate::api::{bad_request, internal_error, ErrorResponse};
use crate::models::{SchedulingRequest, SchedulingResponse};
use crate::scheduler::{Scheduler, SchedulingContext};

/// Synchronously plan a day of bookings
#[utoipa::path(
    post,
    path = "/v1_webapp_auto_scheduling",
    request_body = SchedulingRequest,
    responses(
        (status = 200, description = "Complete plan for the requested day", body = SchedulingResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 403, description = "Origin not allowed", body = ErrorResponse),
        (status = 500, description = "Scheduling failed", body = ErrorResponse)
    ),
    tag = "scheduling"
)]
pub async fn calculate(
    State(state): State<SchedulingState>,
    payload: Result<Json<SchedulingRequest>, JsonRejection>,
) -> Result<Json<SchedulingResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(request) = payload.map_err(bad_request)?;

    let mut context = SchedulingContext::from_request(&request, state.defaults);
    context.debug |= state.debug_mode;

    let scheduler = Scheduler::new(state.directions.clone(), context);
    match scheduler.run(request.bookings).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "Scheduling failed");
            Err(internal_error(e))
        }
    }
}
