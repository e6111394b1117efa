//! Route definitions for the task lifecycle. All endpoints require
//! authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::task;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                 -> list_tasks
/// POST   /                 -> create_task
/// GET    /{id}             -> get_task
/// PUT    /{id}             -> update_task
/// POST   /{id}/start       -> start_task
/// POST   /{id}/complete    -> complete_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(task::list_tasks).post(task::create_task))
        .route("/{id}", get(task::get_task).put(task::update_task))
        .route("/{id}/start", post(task::start_task))
        .route("/{id}/complete", post(task::complete_task))
}
