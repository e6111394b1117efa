//! Repository for the `tasks` table.

use std::ops::Range;

use levelup_core::task::{
    Task, TaskCategory, TaskReward, STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_PENDING,
};
use levelup_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::task::{CreateTask, TaskRow, UpdateTask};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, title, description, category, difficulty, xp_value, \
                        coins_value, deadline, status, completed_at, created_at, updated_at";

/// Provides CRUD and lifecycle operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new pending task with its reward frozen from category and
    /// difficulty.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateTask,
    ) -> Result<TaskRow, sqlx::Error> {
        let reward = TaskReward::for_task(input.category, input.difficulty);
        let query = format!(
            "INSERT INTO tasks (user_id, title, description, category, difficulty,
                                xp_value, coins_value, deadline, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.category.as_str())
            .bind(input.difficulty.as_str())
            .bind(reward.xp_value)
            .bind(reward.coins_value)
            .bind(input.deadline)
            .bind(STATUS_PENDING)
            .fetch_one(pool)
            .await
    }

    /// Find a task owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's tasks, newest first, optionally filtered by status.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TaskRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(user_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Edit an open task.
    ///
    /// The row is locked for the duration of the edit and the reward is
    /// recomputed from the locked category and difficulty, so concurrent
    /// edits always leave a reward that matches the stored pair.
    /// `description` and `deadline` use `CASE WHEN` so an explicit `null`
    /// clears them.
    ///
    /// Returns `None` if the task does not exist, is not owned by `user_id`
    /// or has already been completed.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let lock = format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE id = $1 AND user_id = $2 AND status <> $3
             FOR UPDATE"
        );
        let Some(row) = sqlx::query_as::<_, TaskRow>(&lock)
            .bind(id)
            .bind(user_id)
            .bind(STATUS_COMPLETED)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let current = Task::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let reward = input.reward_for(&current);

        let description_provided = input.description.is_some();
        let description_value = input.description.as_ref().and_then(|d| d.as_deref());
        let deadline_provided = input.deadline.is_some();
        let deadline_value = input.deadline.flatten();

        let query = format!(
            "UPDATE tasks SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                category = COALESCE($5, category),
                difficulty = COALESCE($6, difficulty),
                deadline = CASE WHEN $7 THEN $8 ELSE deadline END,
                xp_value = $9,
                coins_value = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(description_provided)
            .bind(description_value)
            .bind(input.category.map(|c| c.as_str()))
            .bind(input.difficulty.map(|d| d.as_str()))
            .bind(deadline_provided)
            .bind(deadline_value)
            .bind(reward.xp_value)
            .bind(reward.coins_value)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Move a pending task to `in_progress`.
    ///
    /// Returns `None` unless the task exists, is owned by `user_id` and is
    /// still pending.
    pub async fn start(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET status = $3, updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(user_id)
            .bind(STATUS_IN_PROGRESS)
            .bind(STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Mark the task completed, but only if it is owned by `user_id` and not
    /// already completed.
    ///
    /// The status guard sits in the `WHERE` clause, so of several concurrent
    /// callers exactly one gets the row back.
    pub async fn complete_if_open(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        at: Timestamp,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET status = $3, completed_at = $4, updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status <> $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(user_id)
            .bind(STATUS_COMPLETED)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Count completed tasks for a user, optionally within one category.
    pub async fn count_completed(
        pool: &PgPool,
        user_id: DbId,
        category: Option<TaskCategory>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks
             WHERE user_id = $1 AND status = $2 AND ($3::text IS NULL OR category = $3)",
        )
        .bind(user_id)
        .bind(STATUS_COMPLETED)
        .bind(category.map(|c| c.as_str()))
        .fetch_one(pool)
        .await
    }

    /// Count completed tasks for a user whose UTC completion hour lies in
    /// the half-open range `hours`.
    pub async fn count_completed_in_hours(
        pool: &PgPool,
        user_id: DbId,
        hours: Range<u32>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks
             WHERE user_id = $1 AND status = $2
               AND EXTRACT(HOUR FROM completed_at AT TIME ZONE 'UTC')::int >= $3
               AND EXTRACT(HOUR FROM completed_at AT TIME ZONE 'UTC')::int < $4",
        )
        .bind(user_id)
        .bind(STATUS_COMPLETED)
        .bind(hours.start as i32)
        .bind(hours.end as i32)
        .fetch_one(pool)
        .await
    }
}
