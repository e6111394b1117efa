//! Progression orchestrator.
//!
//! Drives the task-completion and focus-session use cases end to end:
//! reward calculation, streak transition, one atomic progress write,
//! achievement evaluation and event emission, strictly in that order.
//!
//! Failure policy for task completion:
//!
//! | Stage                         | On failure                                      |
//! |-------------------------------|-------------------------------------------------|
//! | user lookup, conditional flip | abort, nothing mutated                          |
//! | reward + progress write       | abort with the task already completed (logged)  |
//! | achievement evaluation        | logged per rule, never aborts                   |
//! | event publishing              | swallowed by the publisher                      |

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::evaluator::{AchievementEvaluator, Evaluation};
use crate::events::{EventPublisher, ProgressionEvent, Topic};
use crate::leveling::level_for_xp;
use crate::progress::{ProgressDelta, UserProgress};
use crate::rewards::{completion_reward, focus_reward, CompletionReward, MAX_FOCUS_MINUTES};
use crate::store::{ProgressionStore, StoreError};
use crate::streak::{advance_streak, StreakUpdate};
use crate::task::Task;
use crate::types::{DbId, Timestamp};

#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    /// The acting user has no progression record.
    #[error("User {user_id} not found")]
    UserNotFound { user_id: DbId },

    /// The task does not exist, belongs to someone else or is already
    /// completed. Safe to treat as a no-op on retry.
    #[error("Task not found or already completed")]
    TaskUnavailable { task_id: DbId },

    /// The task was flipped to completed but the reward write failed.
    #[error("Task {task_id} was completed but its rewards were not applied")]
    RewardsNotApplied {
        task_id: DbId,
        #[source]
        source: StoreError,
    },

    #[error("Invalid focus session: {0}")]
    InvalidFocusSession(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a successful task completion returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub task: Task,
    pub xp_awarded: i64,
    pub coins_awarded: i64,
    pub reward: CompletionReward,
    pub streak: StreakUpdate,
    pub level_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_level: Option<i32>,
    /// Display names of achievements unlocked by this completion.
    pub new_achievements: Vec<String>,
    /// Final user record after rewards and achievement grants.
    #[serde(skip)]
    pub user: UserProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct FocusOutcome {
    pub minutes: i32,
    pub xp_awarded: i64,
    pub coins_awarded: i64,
    pub streak: StreakUpdate,
    pub level_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_level: Option<i32>,
    pub new_achievements: Vec<String>,
    #[serde(skip)]
    pub user: UserProgress,
}

/// Level before and after one progression step.
struct LevelChange {
    previous: i32,
    current: i32,
}

impl LevelChange {
    fn level_up(&self) -> bool {
        self.current > self.previous
    }

    fn new_level(&self) -> Option<i32> {
        self.level_up().then_some(self.current)
    }
}

pub struct ProgressionEngine {
    store: Arc<dyn ProgressionStore>,
    publisher: Arc<dyn EventPublisher>,
    evaluator: AchievementEvaluator,
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn ProgressionStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        let evaluator = AchievementEvaluator::new(store.clone());
        Self {
            store,
            publisher,
            evaluator,
        }
    }

    /// Complete a task for `user_id` now.
    pub async fn complete_task(
        &self,
        user_id: DbId,
        task_id: DbId,
    ) -> Result<CompletionOutcome, ProgressionError> {
        self.complete_task_at(user_id, task_id, Utc::now()).await
    }

    /// Complete a task for `user_id` at `now`.
    pub async fn complete_task_at(
        &self,
        user_id: DbId,
        task_id: DbId,
        now: Timestamp,
    ) -> Result<CompletionOutcome, ProgressionError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(ProgressionError::UserNotFound { user_id })?;

        let task = self
            .store
            .complete_task_if_open(task_id, user_id, now)
            .await?
            .ok_or(ProgressionError::TaskUnavailable { task_id })?;

        let reward = completion_reward(&task, user.streak, now);
        let streak = advance_streak(
            user.last_active_date,
            user.streak,
            user.stats.longest_streak,
            now,
        );
        let delta = ProgressDelta {
            xp: reward.xp,
            coins: reward.coins,
            tasks_completed: 1,
            ..ProgressDelta::default()
        }
        .with_streak(&streak);

        let rewarded = match self.store.apply_progress(user_id, &delta).await {
            Ok(Some(rewarded)) => rewarded,
            Ok(None) => {
                tracing::error!(
                    user_id,
                    task_id,
                    "Task completed but user vanished before rewards were applied",
                );
                return Err(ProgressionError::RewardsNotApplied {
                    task_id,
                    source: StoreError::new("user record missing during reward write"),
                });
            }
            Err(e) => {
                tracing::error!(
                    user_id,
                    task_id,
                    xp = reward.xp,
                    coins = reward.coins,
                    error = %e,
                    "Task completed but rewards were not applied",
                );
                return Err(ProgressionError::RewardsNotApplied {
                    task_id,
                    source: e,
                });
            }
        };

        let evaluation = self.evaluator.evaluate(&rewarded, Some(&task), now).await;
        let (final_user, levels) = settle(&rewarded, reward.xp, &evaluation);

        tracing::info!(
            user_id,
            task_id,
            xp = reward.xp,
            coins = reward.coins,
            streak = final_user.streak,
            level = final_user.level,
            achievements = evaluation.unlocked.len(),
            "Task completed",
        );

        let topic = Topic::User(user_id);
        self.publisher.publish(
            topic,
            ProgressionEvent::TaskCompleted {
                task_id,
                title: task.title.clone(),
                reward,
            },
        );
        self.publish_progress(user_id, reward.xp, reward.coins, &rewarded, &levels);
        for unlocked in &evaluation.unlocked {
            self.publisher.publish(topic, unlocked.event());
        }
        self.publish_leaderboard(&final_user);

        Ok(CompletionOutcome {
            task,
            xp_awarded: reward.xp,
            coins_awarded: reward.coins,
            reward,
            streak,
            level_up: levels.level_up(),
            new_level: levels.new_level(),
            new_achievements: unlocked_names(&evaluation),
            user: final_user,
        })
    }

    /// Record a finished focus session of `minutes` now.
    pub async fn complete_focus_session(
        &self,
        user_id: DbId,
        minutes: i32,
    ) -> Result<FocusOutcome, ProgressionError> {
        self.complete_focus_session_at(user_id, minutes, Utc::now())
            .await
    }

    /// Record a finished focus session of `minutes` at `now`.
    ///
    /// Counts as a streak-qualifying action and is evaluated for achievements
    /// without a task, so only cumulative criteria can unlock.
    pub async fn complete_focus_session_at(
        &self,
        user_id: DbId,
        minutes: i32,
        now: Timestamp,
    ) -> Result<FocusOutcome, ProgressionError> {
        if !(1..=MAX_FOCUS_MINUTES).contains(&minutes) {
            return Err(ProgressionError::InvalidFocusSession(format!(
                "minutes must be between 1 and {MAX_FOCUS_MINUTES}, got {minutes}"
            )));
        }

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(ProgressionError::UserNotFound { user_id })?;

        let (xp, coins) = focus_reward(minutes);
        let streak = advance_streak(
            user.last_active_date,
            user.streak,
            user.stats.longest_streak,
            now,
        );
        let delta = ProgressDelta {
            xp,
            coins,
            focus_minutes: i64::from(minutes),
            ..ProgressDelta::default()
        }
        .with_streak(&streak);

        let rewarded = self
            .store
            .apply_progress(user_id, &delta)
            .await?
            .ok_or(ProgressionError::UserNotFound { user_id })?;

        let evaluation = self.evaluator.evaluate(&rewarded, None, now).await;
        let (final_user, levels) = settle(&rewarded, xp, &evaluation);

        tracing::info!(user_id, minutes, xp, coins, "Focus session completed");

        let topic = Topic::User(user_id);
        self.publisher
            .publish(topic, ProgressionEvent::FocusCompleted { minutes });
        self.publish_progress(user_id, xp, coins, &rewarded, &levels);
        for unlocked in &evaluation.unlocked {
            self.publisher.publish(topic, unlocked.event());
        }
        self.publish_leaderboard(&final_user);

        Ok(FocusOutcome {
            minutes,
            xp_awarded: xp,
            coins_awarded: coins,
            streak,
            level_up: levels.level_up(),
            new_level: levels.new_level(),
            new_achievements: unlocked_names(&evaluation),
            user: final_user,
        })
    }

    fn publish_progress(
        &self,
        user_id: DbId,
        xp: i64,
        coins: i64,
        rewarded: &UserProgress,
        levels: &LevelChange,
    ) {
        let topic = Topic::User(user_id);
        self.publisher.publish(
            topic,
            ProgressionEvent::XpGained {
                amount: xp,
                total: rewarded.xp,
            },
        );
        self.publisher.publish(
            topic,
            ProgressionEvent::CoinsEarned {
                amount: coins,
                total: rewarded.coins,
            },
        );
        if levels.level_up() {
            self.publisher.publish(
                topic,
                ProgressionEvent::LevelUp {
                    previous_level: levels.previous,
                    new_level: levels.current,
                },
            );
        }
    }

    fn publish_leaderboard(&self, user: &UserProgress) {
        self.publisher.publish(
            Topic::Leaderboard,
            ProgressionEvent::LeaderboardUpdate {
                user_id: user.id,
                username: user.username.clone(),
                xp: user.xp,
                level: user.level,
            },
        );
    }
}

/// Pick the final user record and compute the level change.
///
/// Both ends are derived from the xp this request's write started from plus
/// what this request added (its reward and its achievement grants), so xp a
/// concurrent request adds for the same user neither steals nor fabricates
/// a level-up here.
fn settle(
    rewarded: &UserProgress,
    xp_added: i64,
    evaluation: &Evaluation,
) -> (UserProgress, LevelChange) {
    let final_user = evaluation.user.clone().unwrap_or_else(|| rewarded.clone());
    let granted_xp: i64 = evaluation.unlocked.iter().map(|u| u.reward.xp).sum();
    let starting_xp = rewarded.xp - xp_added;
    let levels = LevelChange {
        previous: level_for_xp(starting_xp),
        current: level_for_xp(starting_xp + xp_added + granted_xp),
    };
    (final_user, levels)
}

fn unlocked_names(evaluation: &Evaluation) -> Vec<String> {
    evaluation
        .unlocked
        .iter()
        .map(|unlocked| unlocked.name.clone())
        .collect()
}
