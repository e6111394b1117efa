//! In-process [`ProgressionStore`] backed by a single mutex.
//!
//! Every trait method runs under one lock, which gives the same atomicity
//! the database store gets from single-statement updates and row locks.
//! Used by the engine tests and for running the engine without Postgres.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::achievements::{
    catalog, AchievementDefinition, AchievementKey, AchievementProgress, TimeOfDay,
};
use crate::progress::{ProgressDelta, UserProgress};
use crate::store::{ProgressionStore, StoreError, StoreResult};
use crate::task::{Task, TaskCategory, TaskDifficulty, TaskReward, TaskState};
use crate::types::{DbId, Timestamp};

#[derive(Default)]
struct State {
    users: HashMap<DbId, UserProgress>,
    tasks: HashMap<DbId, Task>,
    definitions: Vec<AchievementDefinition>,
    progress: HashMap<(DbId, AchievementKey), AchievementProgress>,
    next_user_id: DbId,
    next_task_id: DbId,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_category_counts: AtomicBool,
    fail_progress_writes: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryStore {
    /// A store seeded with the standard achievement catalog.
    pub fn with_catalog() -> Self {
        Self::with_definitions(catalog())
    }

    pub fn with_definitions(definitions: Vec<AchievementDefinition>) -> Self {
        Self {
            state: Mutex::new(State {
                definitions,
                ..State::default()
            }),
            ..Self::default()
        }
    }

    /// Register a new user with the starting grant.
    pub async fn create_user(&self, username: &str) -> UserProgress {
        let mut state = self.state.lock().await;
        state.next_user_id += 1;
        let user = UserProgress::new(state.next_user_id, username);
        state.users.insert(user.id, user.clone());
        user
    }

    /// Replace a user's record wholesale (test setup).
    pub async fn put_user(&self, user: UserProgress) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn user(&self, user_id: DbId) -> Option<UserProgress> {
        self.state.lock().await.users.get(&user_id).cloned()
    }

    /// Create a pending task with its reward frozen from category/difficulty.
    pub async fn create_task(
        &self,
        user_id: DbId,
        title: &str,
        category: TaskCategory,
        difficulty: TaskDifficulty,
        deadline: Option<Timestamp>,
    ) -> Task {
        let mut state = self.state.lock().await;
        state.next_task_id += 1;
        let task = Task {
            id: state.next_task_id,
            user_id,
            title: title.to_string(),
            description: None,
            category,
            difficulty,
            reward: TaskReward::for_task(category, difficulty),
            deadline,
            state: TaskState::Pending,
            created_at: Utc::now(),
        };
        state.tasks.insert(task.id, task.clone());
        task
    }

    pub async fn task(&self, task_id: DbId) -> Option<Task> {
        self.state.lock().await.tasks.get(&task_id).cloned()
    }

    /// Number of `apply_progress` and `grant_achievement` writes performed.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub async fn achievement_progress(
        &self,
        user_id: DbId,
        key: AchievementKey,
    ) -> Option<AchievementProgress> {
        self.state.lock().await.progress.get(&(user_id, key)).cloned()
    }
}

/// Fault injection for tests. Nothing outside tests should call these.
impl InMemoryStore {
    /// Make category count queries fail.
    pub fn fail_category_counts(&self, fail: bool) {
        self.fail_category_counts.store(fail, Ordering::Relaxed);
    }

    /// Make `apply_progress` fail without writing.
    pub fn fail_progress_writes(&self, fail: bool) {
        self.fail_progress_writes.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl ProgressionStore for InMemoryStore {
    async fn find_user(&self, user_id: DbId) -> StoreResult<Option<UserProgress>> {
        Ok(self.user(user_id).await)
    }

    async fn complete_task_if_open(
        &self,
        task_id: DbId,
        user_id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.lock().await;
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return Ok(None);
        };
        if task.user_id != user_id || task.is_completed() {
            return Ok(None);
        }
        task.state = TaskState::Completed { completed_at: at };
        Ok(Some(task.clone()))
    }

    async fn apply_progress(
        &self,
        user_id: DbId,
        delta: &ProgressDelta,
    ) -> StoreResult<Option<UserProgress>> {
        if self.fail_progress_writes.load(Ordering::Relaxed) {
            return Err(StoreError::new("progress write rejected"));
        }
        let mut state = self.state.lock().await;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(state.users.get_mut(&user_id).map(|user| {
            user.apply(delta);
            user.clone()
        }))
    }

    async fn count_completed_tasks(
        &self,
        user_id: DbId,
        category: Option<TaskCategory>,
    ) -> StoreResult<i64> {
        if category.is_some() && self.fail_category_counts.load(Ordering::Relaxed) {
            return Err(StoreError::new("category count unavailable"));
        }
        let state = self.state.lock().await;
        let count = state
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && t.is_completed())
            .filter(|t| category.map_or(true, |c| t.category == c))
            .count();
        Ok(count as i64)
    }

    async fn count_completed_in_window(
        &self,
        user_id: DbId,
        window: TimeOfDay,
    ) -> StoreResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && window.includes(t))
            .count();
        Ok(count as i64)
    }

    async fn list_active_achievements(&self) -> StoreResult<Vec<AchievementDefinition>> {
        let state = self.state.lock().await;
        Ok(state
            .definitions
            .iter()
            .filter(|d| d.is_active)
            .cloned()
            .collect())
    }

    async fn record_achievement_progress(
        &self,
        user_id: DbId,
        key: AchievementKey,
        value: i64,
        at: Timestamp,
    ) -> StoreResult<AchievementProgress> {
        let mut state = self.state.lock().await;
        let record = state
            .progress
            .entry((user_id, key))
            .or_insert_with(|| AchievementProgress::new(key));
        record.apply(value, at);
        Ok(record.clone())
    }

    async fn grant_achievement(
        &self,
        user_id: DbId,
        definition: &AchievementDefinition,
        at: Timestamp,
    ) -> StoreResult<Option<UserProgress>> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if !user.achievements.insert(definition.key) {
            return Ok(None);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        user.apply(&ProgressDelta {
            xp: definition.reward.xp,
            coins: definition.reward.coins,
            ..ProgressDelta::default()
        });
        let user = user.clone();

        state
            .progress
            .entry((user_id, definition.key))
            .or_insert_with(|| AchievementProgress::new(definition.key))
            .mark_unlocked(at);

        Ok(Some(user))
    }
}
