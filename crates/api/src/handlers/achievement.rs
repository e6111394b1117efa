//! Achievement catalog and per-user achievement status.

use std::collections::HashMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use levelup_core::achievements::{
    AchievementCategory, AchievementDefinition, AchievementKey, AchievementProgress,
    AchievementReward, Rarity,
};
use levelup_core::progress::UserProgress;
use levelup_core::types::Timestamp;
use levelup_db::repositories::AchievementRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::progress::load_user;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// One achievement as seen by a specific user.
#[derive(Debug, Serialize)]
pub struct AchievementStatus {
    pub key: AchievementKey,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub rarity: Rarity,
    pub reward: AchievementReward,
    pub target: i64,
    /// Never above `target`.
    pub progress: i64,
    pub is_unlocked: bool,
    pub unlocked_at: Option<Timestamp>,
}

impl AchievementStatus {
    fn new(
        definition: AchievementDefinition,
        user: &UserProgress,
        tracked: Option<&AchievementProgress>,
    ) -> Self {
        let target = definition.criteria.target();
        let is_unlocked =
            user.has_achievement(definition.key) || tracked.is_some_and(|p| p.is_unlocked);
        let progress = if is_unlocked {
            target
        } else {
            tracked.map_or(0, |p| p.reported_progress(target))
        };
        Self {
            key: definition.key,
            name: definition.name,
            description: definition.description,
            category: definition.category,
            rarity: definition.rarity,
            reward: definition.reward,
            target,
            progress,
            is_unlocked,
            unlocked_at: tracked.and_then(|p| p.unlocked_at),
        }
    }
}

async fn active_definitions(state: &AppState) -> AppResult<Vec<AchievementDefinition>> {
    let rows = AchievementRepo::list_active(&state.pool).await?;
    Ok(rows
        .into_iter()
        .map(AchievementDefinition::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

/// GET /api/v1/achievements
///
/// The active achievement catalog.
pub async fn list_achievements(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let definitions = active_definitions(&state).await?;
    Ok(Json(DataResponse { data: definitions }))
}

/// GET /api/v1/me/achievements
///
/// Every active achievement with the user's progress towards it.
pub async fn list_my_achievements(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let progress = load_user(&state, user.user_id).await?;
    let definitions = active_definitions(&state).await?;

    let tracked: HashMap<AchievementKey, AchievementProgress> =
        AchievementRepo::list_progress(&state.pool, user.user_id)
            .await?
            .into_iter()
            .filter_map(|row| match AchievementProgress::try_from(row) {
                Ok(p) => Some((p.key, p)),
                Err(e) => {
                    tracing::warn!(user_id = user.user_id, error = %e, "Skipping unreadable achievement progress");
                    None
                }
            })
            .collect();

    let statuses: Vec<AchievementStatus> = definitions
        .into_iter()
        .map(|definition| {
            let record = tracked.get(&definition.key);
            AchievementStatus::new(definition, &progress, record)
        })
        .collect();

    Ok(Json(DataResponse { data: statuses }))
}
