use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use levelup_core::achievements::AchievementKey;
use levelup_core::error::CoreError;
use levelup_core::leveling::{level_progress, LevelProgress};
use levelup_core::progress::{UserProgress, UserStats};
use levelup_core::types::{DbId, Timestamp};
use levelup_db::repositories::UserRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// The authenticated user's progression summary.
#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub user_id: DbId,
    pub username: String,
    pub xp: i64,
    pub coins: i64,
    pub level: LevelProgress,
    pub streak: i32,
    pub last_active_date: Option<Timestamp>,
    pub stats: UserStats,
    pub achievements: Vec<AchievementKey>,
}

impl From<UserProgress> for ProgressView {
    fn from(user: UserProgress) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            xp: user.xp,
            coins: user.coins,
            level: level_progress(user.xp),
            streak: user.streak,
            last_active_date: user.last_active_date,
            stats: user.stats,
            achievements: user.achievements.into_iter().collect(),
        }
    }
}

pub(crate) async fn load_user(state: &AppState, user_id: DbId) -> AppResult<UserProgress> {
    let row = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;
    Ok(row.into())
}

/// GET /api/v1/me/progress
pub async fn get_progress(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let progress = load_user(&state, user.user_id).await?;
    Ok(Json(DataResponse {
        data: ProgressView::from(progress),
    }))
}
