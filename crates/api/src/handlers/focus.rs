use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct FocusSessionRequest {
    #[validate(range(min = 1, max = 480))]
    pub minutes: i32,
}

/// POST /api/v1/focus-sessions
///
/// Records a finished focus session for the authenticated user.
pub async fn complete_focus_session(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FocusSessionRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let outcome = state
        .engine
        .complete_focus_session(user.user_id, input.minutes)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}
