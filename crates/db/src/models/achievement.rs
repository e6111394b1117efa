//! Achievement definition and per-user progress rows.

use levelup_core::achievements::{
    AchievementDefinition, AchievementProgress, AchievementReward, Criteria, ProgressEntry,
};
use levelup_core::error::CoreError;
use levelup_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// Full row from the `achievements` table.
#[derive(Debug, Clone, FromRow)]
pub struct AchievementRow {
    pub id: DbId,
    pub key: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub rarity: String,
    pub criteria_type: String,
    pub criteria_target: i64,
    pub criteria_category: Option<String>,
    pub reward_xp: i64,
    pub reward_coins: i64,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AchievementRow> for AchievementDefinition {
    type Error = CoreError;

    fn try_from(row: AchievementRow) -> Result<Self, Self::Error> {
        Ok(AchievementDefinition {
            key: row.key.parse()?,
            criteria: Criteria::from_parts(
                &row.criteria_type,
                row.criteria_target,
                row.criteria_category.as_deref(),
            )?,
            name: row.name,
            description: row.description,
            category: row.category.parse()?,
            rarity: row.rarity.parse()?,
            reward: AchievementReward {
                xp: row.reward_xp,
                coins: row.reward_coins,
            },
            is_active: row.is_active,
        })
    }
}

/// Full row from the `user_achievements` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserAchievementRow {
    pub id: DbId,
    pub user_id: DbId,
    pub achievement_key: String,
    pub progress: i64,
    pub is_unlocked: bool,
    pub unlocked_at: Option<Timestamp>,
    pub history: Json<Vec<ProgressEntry>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<UserAchievementRow> for AchievementProgress {
    type Error = CoreError;

    fn try_from(row: UserAchievementRow) -> Result<Self, Self::Error> {
        Ok(AchievementProgress {
            key: row.achievement_key.parse()?,
            progress: row.progress,
            is_unlocked: row.is_unlocked,
            unlocked_at: row.unlocked_at,
            history: row.history.0,
        })
    }
}
