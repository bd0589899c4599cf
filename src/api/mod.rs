pub mod error;
pub mod health;
pub mod scheduling;

pub use error::{bad_request, internal_error, not_found, ErrorResponse};

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};

use crate::config::Config;
use crate::providers::directions::Directions;
use crate::tasks::TaskStore;

pub fn router(config: Arc<Config>, directions: Arc<dyn Directions>, store: TaskStore) -> Router {
    let scheduling_state = scheduling::SchedulingState {
        directions,
        store: store.clone(),
        defaults: config.scheduling,
        debug_mode: config.debug_mode,
    };
    let cache_enabled = config.cache.enable;

    Router::new()
        .route("/", get(root))
        .nest(
            "/v1_webapp_auto_scheduling",
            scheduling::router(scheduling_state, config),
        )
        .nest("/health", health::router(store, cache_enabled))
}

/// Liveness probe: an empty object.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

/// Exact-match allow-listing of the `Origin` header.
pub async fn check_origin(
    State(config): State<Arc<Config>>,
    request: Request,
    next: Next,
) -> Response {
    if !config.enable_origin_check {
        return next.run(request).await;
    }
    let allowed = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|origin| config.acceptable_origins.iter().any(|c| c == origin));
    if allowed {
        next.run(request).await
    } else {
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "Origin not allowed".to_string(),
            }),
        )
            .into_response()
    }
}
