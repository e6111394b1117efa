//! PostgreSQL implementation of [`ProgressionStore`].
//!
//! Counter changes are increment-style `UPDATE ... RETURNING` statements. The
//! returned row stays locked until commit, which is where the level is
//! reconciled with the new xp, so no concurrent writer can observe or
//! overwrite a stale level.

use async_trait::async_trait;
use levelup_core::achievements::{
    AchievementDefinition, AchievementKey, AchievementProgress, TimeOfDay,
};
use levelup_core::leveling::level_for_xp;
use levelup_core::progress::{ProgressDelta, UserProgress};
use levelup_core::store::{ProgressionStore, StoreError, StoreResult};
use levelup_core::task::{Task, TaskCategory};
use levelup_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::user::UserRow;
use crate::repositories::{AchievementRepo, TaskRepo, UserRepo};
use crate::DbPool;

#[derive(Clone)]
pub struct PgProgressionStore {
    pool: DbPool,
}

impl PgProgressionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::with_source(context, e)
}

/// Bring `level` in line with `xp` on a row locked by the current
/// transaction and return the domain record.
async fn reconcile_level(conn: &mut PgConnection, mut row: UserRow) -> StoreResult<UserProgress> {
    let level = level_for_xp(row.xp);
    if level != row.level {
        UserRepo::set_level(conn, row.id, level)
            .await
            .map_err(db_error("failed to update level"))?;
        row.level = level;
    }
    Ok(row.into())
}

#[async_trait]
impl ProgressionStore for PgProgressionStore {
    async fn find_user(&self, user_id: DbId) -> StoreResult<Option<UserProgress>> {
        let row = UserRepo::find_by_id(&self.pool, user_id)
            .await
            .map_err(db_error("failed to load user"))?;
        Ok(row.map(Into::into))
    }

    async fn complete_task_if_open(
        &self,
        task_id: DbId,
        user_id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<Task>> {
        let row = TaskRepo::complete_if_open(&self.pool, task_id, user_id, at)
            .await
            .map_err(db_error("failed to complete task"))?;
        row.map(Task::try_from)
            .transpose()
            .map_err(|e| StoreError::with_source("invalid task row", e))
    }

    async fn apply_progress(
        &self,
        user_id: DbId,
        delta: &ProgressDelta,
    ) -> StoreResult<Option<UserProgress>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("failed to begin transaction"))?;

        let Some(row) = UserRepo::apply_delta(&mut *tx, user_id, delta)
            .await
            .map_err(db_error("failed to apply progress"))?
        else {
            return Ok(None);
        };
        let user = reconcile_level(&mut *tx, row).await?;

        tx.commit()
            .await
            .map_err(db_error("failed to commit progress"))?;
        Ok(Some(user))
    }

    async fn count_completed_tasks(
        &self,
        user_id: DbId,
        category: Option<TaskCategory>,
    ) -> StoreResult<i64> {
        TaskRepo::count_completed(&self.pool, user_id, category)
            .await
            .map_err(db_error("failed to count completed tasks"))
    }

    async fn count_completed_in_window(
        &self,
        user_id: DbId,
        window: TimeOfDay,
    ) -> StoreResult<i64> {
        TaskRepo::count_completed_in_hours(&self.pool, user_id, window.hours())
            .await
            .map_err(db_error("failed to count completed tasks by hour"))
    }

    async fn list_active_achievements(&self) -> StoreResult<Vec<AchievementDefinition>> {
        let rows = AchievementRepo::list_active(&self.pool)
            .await
            .map_err(db_error("failed to list achievements"))?;

        // A definition that no longer parses is skipped rather than hiding
        // every other achievement.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let key = row.key.clone();
                match AchievementDefinition::try_from(row) {
                    Ok(definition) => Some(definition),
                    Err(e) => {
                        tracing::warn!(achievement = %key, error = %e, "Skipping invalid achievement definition");
                        None
                    }
                }
            })
            .collect())
    }

    async fn record_achievement_progress(
        &self,
        user_id: DbId,
        key: AchievementKey,
        value: i64,
        at: Timestamp,
    ) -> StoreResult<AchievementProgress> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("failed to begin transaction"))?;

        let row = AchievementRepo::lock_progress(&mut *tx, user_id, key)
            .await
            .map_err(db_error("failed to lock achievement progress"))?;
        let mut record = AchievementProgress::try_from(row)
            .map_err(|e| StoreError::with_source("invalid achievement progress row", e))?;

        if record.apply(value, at) {
            AchievementRepo::save_progress(&mut *tx, user_id, &record)
                .await
                .map_err(db_error("failed to save achievement progress"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("failed to commit achievement progress"))?;
        Ok(record)
    }

    async fn grant_achievement(
        &self,
        user_id: DbId,
        definition: &AchievementDefinition,
        at: Timestamp,
    ) -> StoreResult<Option<UserProgress>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("failed to begin transaction"))?;

        let Some(row) = UserRepo::grant_achievement(
            &mut *tx,
            user_id,
            definition.key.as_str(),
            definition.reward.xp,
            definition.reward.coins,
        )
        .await
        .map_err(db_error("failed to grant achievement"))?
        else {
            return Ok(None);
        };
        let user = reconcile_level(&mut *tx, row).await?;

        let progress = AchievementRepo::lock_progress(&mut *tx, user_id, definition.key)
            .await
            .map_err(db_error("failed to lock achievement progress"))?;
        let mut record = AchievementProgress::try_from(progress)
            .map_err(|e| StoreError::with_source("invalid achievement progress row", e))?;
        record.mark_unlocked(at);
        AchievementRepo::save_progress(&mut *tx, user_id, &record)
            .await
            .map_err(db_error("failed to save achievement progress"))?;

        tx.commit()
            .await
            .map_err(db_error("failed to commit achievement grant"))?;
        Ok(Some(user))
    }
}
