use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use levelup_db::repositories::UserRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::{clamp_limit, MAX_PAGE_LIMIT};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

/// GET /api/v1/leaderboard?limit=
///
/// Users ranked by xp, ties broken by id.
pub async fn get_leaderboard(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, state.config.leaderboard_limit, MAX_PAGE_LIMIT);
    let entries = UserRepo::leaderboard(&state.pool, limit).await?;
    Ok(Json(DataResponse { data: entries }))
}
