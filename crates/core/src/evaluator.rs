//! Achievement evaluation.
//!
//! For one user (and optionally the task that was just completed) every
//! active definition the user does not already hold is measured, the
//! measured value is folded into the tracked progress, and definitions whose
//! progress reaches the target are granted.
//!
//! Every measurement is an absolute value read from the user or the store,
//! never a delta, so evaluating the same user and task again records nothing
//! new.
//!
//! Measurements are independent reads and run concurrently. Progress writes
//! and grants touch the user's shared counters and run one after another.
//! Any single failing rule is logged and skipped; evaluation itself never
//! fails.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::achievements::{AchievementDefinition, AchievementKey, AchievementReward, Criteria};
use crate::events::ProgressionEvent;
use crate::progress::UserProgress;
use crate::store::{ProgressionStore, StoreResult};
use crate::task::Task;
use crate::types::Timestamp;

/// An achievement granted during one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlockedAchievement {
    pub key: AchievementKey,
    pub name: String,
    pub reward: AchievementReward,
    pub unlocked_at: Timestamp,
}

impl UnlockedAchievement {
    pub fn event(&self) -> ProgressionEvent {
        ProgressionEvent::AchievementUnlocked {
            key: self.key,
            name: self.name.clone(),
            reward: self.reward,
        }
    }
}

/// Result of an evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Grants in the order they were applied.
    pub unlocked: Vec<UnlockedAchievement>,
    /// The user record as returned by the last successful grant, if any.
    pub user: Option<UserProgress>,
}

pub struct AchievementEvaluator {
    store: Arc<dyn ProgressionStore>,
}

impl AchievementEvaluator {
    pub fn new(store: Arc<dyn ProgressionStore>) -> Self {
        Self { store }
    }

    /// Evaluate all active achievements for `user`.
    ///
    /// Definitions already in `user.achievements` are skipped before anything
    /// is measured, and the store refuses a second grant of the same key, so
    /// running this twice never grants anything twice.
    pub async fn evaluate(
        &self,
        user: &UserProgress,
        task: Option<&Task>,
        at: Timestamp,
    ) -> Evaluation {
        let definitions = match self.store.list_active_achievements().await {
            Ok(definitions) => definitions,
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "Failed to load achievement definitions");
                return Evaluation::default();
            }
        };

        let pending: Vec<AchievementDefinition> = definitions
            .into_iter()
            .filter(|definition| !user.has_achievement(definition.key))
            .collect();

        let measurements = join_all(
            pending
                .iter()
                .map(|definition| self.measure(user, task, &definition.criteria)),
        )
        .await;

        let mut evaluation = Evaluation::default();
        for (definition, measured) in pending.iter().zip(measurements) {
            let value = match measured {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(
                        user_id = user.id,
                        achievement = %definition.key,
                        error = %e,
                        "Achievement check failed, skipping",
                    );
                    continue;
                }
            };

            let progress = match self
                .store
                .record_achievement_progress(user.id, definition.key, value, at)
                .await
            {
                Ok(record) => record.progress,
                Err(e) => {
                    tracing::warn!(
                        user_id = user.id,
                        achievement = %definition.key,
                        error = %e,
                        "Failed to record achievement progress",
                    );
                    value
                }
            };

            if progress < definition.criteria.target() {
                continue;
            }

            match self.store.grant_achievement(user.id, definition, at).await {
                Ok(Some(updated)) => {
                    tracing::info!(
                        user_id = user.id,
                        achievement = %definition.key,
                        xp = definition.reward.xp,
                        coins = definition.reward.coins,
                        "Achievement unlocked",
                    );
                    evaluation.unlocked.push(UnlockedAchievement {
                        key: definition.key,
                        name: definition.name.clone(),
                        reward: definition.reward,
                        unlocked_at: at,
                    });
                    evaluation.user = Some(updated);
                }
                Ok(None) => {
                    tracing::debug!(
                        user_id = user.id,
                        achievement = %definition.key,
                        "Achievement already held, not granted again",
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = user.id,
                        achievement = %definition.key,
                        error = %e,
                        "Failed to grant achievement",
                    );
                }
            }
        }

        evaluation
    }

    /// Measure one criterion as an absolute value. `None` means there is
    /// nothing to record.
    async fn measure(
        &self,
        user: &UserProgress,
        task: Option<&Task>,
        criteria: &Criteria,
    ) -> StoreResult<Option<i64>> {
        let value = match criteria {
            Criteria::TaskCount { .. } => user.stats.total_tasks_completed,
            Criteria::Streak { .. } => i64::from(user.streak),
            Criteria::FocusTime { .. } => user.stats.total_focus_minutes,
            Criteria::CategoryTasks { category, .. } => {
                self.store
                    .count_completed_tasks(user.id, Some(*category))
                    .await?
            }
            Criteria::EarlyCompletion { .. } | Criteria::LateCompletion { .. } => {
                // Recounted only when the just-completed task falls in the window.
                let Some(window) = criteria.time_of_day() else {
                    return Ok(None);
                };
                if !task.is_some_and(|t| window.includes(t)) {
                    return Ok(None);
                }
                self.store.count_completed_in_window(user.id, window).await?
            }
        };
        Ok((value > 0).then_some(value))
    }
}
