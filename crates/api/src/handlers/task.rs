//! Handlers for the task lifecycle.
//!
//! Every endpoint is scoped to the authenticated user; another user's task
//! is indistinguishable from a missing one.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use levelup_core::error::CoreError;
use levelup_core::task::{Task, STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_PENDING};
use levelup_core::types::DbId;
use levelup_db::models::task::{CreateTask, UpdateTask};
use levelup_db::repositories::TaskRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn load_task(state: &AppState, id: DbId, user_id: DbId) -> AppResult<Task> {
    let row = TaskRepo::find_for_user(&state.pool, id, user_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Task", id })?;
    Ok(Task::try_from(row)?)
}

/// POST /api/v1/tasks
///
/// The reward is computed from category and difficulty and frozen on the
/// task.
pub async fn create_task(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTask>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let row = TaskRepo::create(&state.pool, user.user_id, &input).await?;
    let task = Task::try_from(row)?;

    tracing::info!(
        user_id = user.user_id,
        task_id = task.id,
        xp_value = task.reward.xp_value,
        "Task created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /api/v1/tasks?status=&limit=&offset=
pub async fn list_tasks(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> AppResult<impl IntoResponse> {
    if let Some(status) = params.status.as_deref() {
        if ![STATUS_PENDING, STATUS_IN_PROGRESS, STATUS_COMPLETED].contains(&status) {
            return Err(AppError::BadRequest(format!("Unknown task status '{status}'")));
        }
    }

    let rows = TaskRepo::list_for_user(
        &state.pool,
        user.user_id,
        params.status.as_deref(),
        clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
        clamp_offset(params.offset),
    )
    .await?;
    let tasks = rows
        .into_iter()
        .map(Task::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(DataResponse { data: tasks }))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = load_task(&state, id, user.user_id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// PUT /api/v1/tasks/{id}
///
/// Completed tasks are immutable. The reward is recomputed only when the
/// category or difficulty actually changes. `null` clears the description
/// or deadline.
pub async fn update_task(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTask>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let current = load_task(&state, id, user.user_id).await?;
    if current.is_completed() {
        return Err(CoreError::InvalidState("Completed tasks cannot be edited".into()).into());
    }

    let row = TaskRepo::update(&state.pool, id, user.user_id, &input)
        .await?
        // Completed between the read and the write.
        .ok_or_else(|| CoreError::InvalidState("Completed tasks cannot be edited".into()))?;
    let task = Task::try_from(row)?;

    tracing::info!(
        user_id = user.user_id,
        task_id = id,
        reward_changed = task.reward != current.reward,
        "Task updated",
    );

    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/tasks/{id}/start
pub async fn start_task(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let current = load_task(&state, id, user.user_id).await?;
    let row = TaskRepo::start(&state.pool, id, user.user_id)
        .await?
        .ok_or_else(|| {
            CoreError::InvalidState(format!(
                "Only pending tasks can be started (task is {})",
                current.state.status_str()
            ))
        })?;
    let task = Task::try_from(row)?;

    tracing::info!(user_id = user.user_id, task_id = id, "Task started");

    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/tasks/{id}/complete
///
/// Applies rewards, streak, level and achievements. A retry after success
/// answers 404 without touching anything.
pub async fn complete_task(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.engine.complete_task(user.user_id, id).await?;
    Ok(Json(DataResponse { data: outcome }))
}
