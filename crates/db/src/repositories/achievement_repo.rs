//! Repository for `achievements` and `user_achievements`.

use levelup_core::achievements::{AchievementDefinition, AchievementKey, AchievementProgress};
use levelup_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::achievement::{AchievementRow, UserAchievementRow};

const COLUMNS: &str = "id, key, name, description, category, rarity, criteria_type, \
                        criteria_target, criteria_category, reward_xp, reward_coins, is_active, \
                        created_at, updated_at";

const PROGRESS_COLUMNS: &str = "id, user_id, achievement_key, progress, is_unlocked, \
                                 unlocked_at, history, created_at, updated_at";

/// Provides queries over achievement definitions and tracked progress.
pub struct AchievementRepo;

impl AchievementRepo {
    /// Upsert the built-in catalog by key.
    ///
    /// Names, descriptions, criteria and rewards follow the catalog; an
    /// operator's `is_active` choice is left alone. Returns the number of
    /// rows written.
    pub async fn seed(
        pool: &PgPool,
        definitions: &[AchievementDefinition],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut written = 0;
        for definition in definitions {
            let result = sqlx::query(
                "INSERT INTO achievements
                    (key, name, description, category, rarity, criteria_type,
                     criteria_target, criteria_category, reward_xp, reward_coins, is_active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (key) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    category = EXCLUDED.category,
                    rarity = EXCLUDED.rarity,
                    criteria_type = EXCLUDED.criteria_type,
                    criteria_target = EXCLUDED.criteria_target,
                    criteria_category = EXCLUDED.criteria_category,
                    reward_xp = EXCLUDED.reward_xp,
                    reward_coins = EXCLUDED.reward_coins,
                    updated_at = NOW()",
            )
            .bind(definition.key.as_str())
            .bind(&definition.name)
            .bind(&definition.description)
            .bind(definition.category.as_str())
            .bind(definition.rarity.as_str())
            .bind(definition.criteria.type_str())
            .bind(definition.criteria.target())
            .bind(definition.criteria.category().map(|c| c.as_str()))
            .bind(definition.reward.xp)
            .bind(definition.reward.coins)
            .bind(definition.is_active)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Active definitions, in id order.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<AchievementRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM achievements WHERE is_active ORDER BY id");
        sqlx::query_as::<_, AchievementRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// All tracked progress rows for a user.
    pub async fn list_progress(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<UserAchievementRow>, sqlx::Error> {
        let query = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_achievements
             WHERE user_id = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, UserAchievementRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Lock (creating if needed) the progress row for `(user_id, key)` for
    /// the rest of the surrounding transaction.
    pub async fn lock_progress(
        conn: &mut PgConnection,
        user_id: DbId,
        key: AchievementKey,
    ) -> Result<UserAchievementRow, sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_achievements (user_id, achievement_key)
             VALUES ($1, $2)
             ON CONFLICT (user_id, achievement_key) DO NOTHING",
        )
        .bind(user_id)
        .bind(key.as_str())
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_achievements
             WHERE user_id = $1 AND achievement_key = $2
             FOR UPDATE"
        );
        sqlx::query_as::<_, UserAchievementRow>(&query)
            .bind(user_id)
            .bind(key.as_str())
            .fetch_one(&mut *conn)
            .await
    }

    /// Write back a progress record previously locked with
    /// [`lock_progress`](Self::lock_progress).
    pub async fn save_progress(
        conn: &mut PgConnection,
        user_id: DbId,
        record: &AchievementProgress,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE user_achievements SET
                progress = $3,
                is_unlocked = $4,
                unlocked_at = $5,
                history = $6,
                updated_at = NOW()
             WHERE user_id = $1 AND achievement_key = $2",
        )
        .bind(user_id)
        .bind(record.key.as_str())
        .bind(record.progress)
        .bind(record.is_unlocked)
        .bind(record.unlocked_at)
        .bind(Json(&record.history))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
