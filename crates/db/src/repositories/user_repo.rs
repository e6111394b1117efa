//! Repository for the `users` table.

use levelup_core::progress::ProgressDelta;
use levelup_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::user::{CreateUser, LeaderboardEntry, UserRow};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, username, xp, coins, level, streak, last_active_date, \
                                  total_tasks_completed, longest_streak, total_focus_minutes, \
                                  achievements, created_at, updated_at";

/// Provides queries over user progression records.
pub struct UserRepo;

impl UserRepo {
    /// Register a user with the starting grant, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username)
             VALUES ($1)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(&input.username)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Top users by xp. Ties are broken by id so ranks are stable.
    pub async fn leaderboard(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT ROW_NUMBER() OVER (ORDER BY xp DESC, id ASC) AS rank,
                    id AS user_id, username, xp, level, streak
             FROM users
             ORDER BY xp DESC, id ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Add `delta` to the user's counters in one statement.
    ///
    /// Streak values are assigned only when the delta carries them;
    /// `longest_streak` never decreases. Returns `None` if the user does not
    /// exist. `level` is left for the caller to reconcile in the same
    /// transaction.
    pub async fn apply_delta(
        conn: &mut PgConnection,
        id: DbId,
        delta: &ProgressDelta,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                xp = GREATEST(xp + $2, 0),
                coins = GREATEST(coins + $3, 0),
                total_tasks_completed = total_tasks_completed + $4,
                total_focus_minutes = total_focus_minutes + $5,
                streak = COALESCE($6, streak),
                last_active_date = COALESCE($7, last_active_date),
                longest_streak = GREATEST(longest_streak, COALESCE($6, streak)),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .bind(delta.xp)
            .bind(delta.coins)
            .bind(delta.tasks_completed)
            .bind(delta.focus_minutes)
            .bind(delta.streak.map(|s| s.streak))
            .bind(delta.streak.map(|s| s.last_active_date))
            .fetch_optional(&mut *conn)
            .await
    }

    /// Append `key` to the user's achievement set and credit its reward,
    /// unless the user already holds it.
    ///
    /// Returns `None` when the user is missing or already holds the key.
    pub async fn grant_achievement(
        conn: &mut PgConnection,
        id: DbId,
        key: &str,
        xp: i64,
        coins: i64,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                achievements = array_append(achievements, $2),
                xp = xp + $3,
                coins = coins + $4,
                updated_at = NOW()
             WHERE id = $1 AND NOT ($2 = ANY(achievements))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .bind(key)
            .bind(xp)
            .bind(coins)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Overwrite the stored level. Only called with `level_for_xp(xp)`.
    pub async fn set_level(
        conn: &mut PgConnection,
        id: DbId,
        level: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET level = $2 WHERE id = $1")
            .bind(id)
            .bind(level)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
