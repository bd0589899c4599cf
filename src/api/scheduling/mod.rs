pub mod calculate;
pub mod tasks;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::config::{Config, SchedulingDefaults};
use crate::providers::directions::Directions;
use crate::tasks::TaskStore;

#[derive(Clone)]
pub struct SchedulingState {
    pub directions: Arc<dyn Directions>,
    pub store: TaskStore,
    pub defaults: SchedulingDefaults,
    pub debug_mode: bool,
}

pub fn router(state: SchedulingState, config: Arc<Config>) -> Router {
    Router::new()
        .route("/", post(calculate::calculate))
        .route("/enqueue", post(tasks::enqueue))
        .route("/{task_id}", get(tasks::get_task))
        .layer(middleware::from_fn_with_state(
            config,
            crate::api::check_origin,
        ))
        .with_state(state)
}
