//! Persistence seam used by the progression engine.
//!
//! The engine never reads-modifies-writes counters itself: every change to
//! xp, coins or stats goes through [`ProgressionStore::apply_progress`] or
//! [`ProgressionStore::grant_achievement`], which implementations must
//! execute as single atomic updates that also recompute `level` from the
//! resulting xp.

use async_trait::async_trait;

use crate::achievements::{AchievementDefinition, AchievementKey, AchievementProgress, TimeOfDay};
use crate::progress::{ProgressDelta, UserProgress};
use crate::task::{Task, TaskCategory};
use crate::types::{DbId, Timestamp};

/// Opaque storage failure.
#[derive(Debug, thiserror::Error)]
#[error("store error: {message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProgressionStore: Send + Sync {
    async fn find_user(&self, user_id: DbId) -> StoreResult<Option<UserProgress>>;

    /// Mark the task completed at `at`, but only if it belongs to `user_id`
    /// and is not already completed. Returns `None` when the guard fails;
    /// exactly one of several concurrent callers can observe `Some`.
    async fn complete_task_if_open(
        &self,
        task_id: DbId,
        user_id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<Task>>;

    /// Atomically add `delta` to the user and recompute `level`.
    async fn apply_progress(
        &self,
        user_id: DbId,
        delta: &ProgressDelta,
    ) -> StoreResult<Option<UserProgress>>;

    /// Number of completed tasks for the user, optionally within one category.
    async fn count_completed_tasks(
        &self,
        user_id: DbId,
        category: Option<TaskCategory>,
    ) -> StoreResult<i64>;

    /// Number of completed tasks for the user whose UTC completion hour
    /// falls in `window`.
    async fn count_completed_in_window(
        &self,
        user_id: DbId,
        window: TimeOfDay,
    ) -> StoreResult<i64>;

    async fn list_active_achievements(&self) -> StoreResult<Vec<AchievementDefinition>>;

    /// Fold a measured absolute value into the user's tracked progress for
    /// `key`, creating the record on first use.
    async fn record_achievement_progress(
        &self,
        user_id: DbId,
        key: AchievementKey,
        value: i64,
        at: Timestamp,
    ) -> StoreResult<AchievementProgress>;

    /// Add the achievement to the user's set and credit its reward in one
    /// atomic write, marking the tracked progress unlocked. Returns `None`
    /// when the user already holds it, in which case nothing is credited.
    async fn grant_achievement(
        &self,
        user_id: DbId,
        definition: &AchievementDefinition,
        at: Timestamp,
    ) -> StoreResult<Option<UserProgress>>;
}
