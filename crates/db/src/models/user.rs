//! User progression rows.

use std::collections::BTreeSet;

use levelup_core::achievements::AchievementKey;
use levelup_core::progress::{UserProgress, UserStats};
use levelup_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub username: String,
    pub xp: i64,
    pub coins: i64,
    pub level: i32,
    pub streak: i32,
    pub last_active_date: Option<Timestamp>,
    pub total_tasks_completed: i64,
    pub longest_streak: i32,
    pub total_focus_minutes: i64,
    pub achievements: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<UserRow> for UserProgress {
    fn from(row: UserRow) -> Self {
        let achievements: BTreeSet<AchievementKey> = row
            .achievements
            .iter()
            .filter_map(|key| match key.parse() {
                Ok(key) => Some(key),
                Err(_) => {
                    tracing::warn!(user_id = row.id, key = %key, "Ignoring unknown achievement key");
                    None
                }
            })
            .collect();

        UserProgress {
            id: row.id,
            username: row.username,
            xp: row.xp,
            coins: row.coins,
            level: row.level,
            streak: row.streak,
            last_active_date: row.last_active_date,
            stats: UserStats {
                total_tasks_completed: row.total_tasks_completed,
                longest_streak: row.longest_streak,
                total_focus_minutes: row.total_focus_minutes,
            },
            achievements,
        }
    }
}

/// DTO for registering a user. The starting coin grant comes from the
/// column default.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
}

/// One leaderboard position.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: DbId,
    pub username: String,
    pub xp: i64,
    pub level: i32,
    pub streak: i32,
}
