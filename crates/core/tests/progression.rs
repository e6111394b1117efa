//! End-to-end tests of the completion use cases against the in-memory store.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use levelup_core::achievements::AchievementKey;
use levelup_core::memory::InMemoryStore;
use levelup_core::progress::UserProgress;
use levelup_core::task::{Task, TaskCategory, TaskDifficulty, TaskState};
use levelup_core::types::{DbId, Timestamp};
use levelup_core::{
    EventPublisher, ProgressionEngine, ProgressionError, ProgressionEvent, Topic,
};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<(Topic, ProgressionEvent)>>,
}

impl RecordingPublisher {
    fn take(&self) -> Vec<(Topic, ProgressionEvent)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn event_types(&self, topic: Topic) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, e)| e.event_type())
            .collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, topic: Topic, event: ProgressionEvent) {
        self.events.lock().unwrap().push((topic, event));
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    publisher: Arc<RecordingPublisher>,
    engine: ProgressionEngine,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::with_catalog());
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = ProgressionEngine::new(store.clone(), publisher.clone());
    Harness {
        store,
        publisher,
        engine,
    }
}

fn at(day: u32, hour: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2026, 6, day, hour, 0, 0).unwrap()
}

impl Harness {
    async fn user(&self, id: DbId) -> UserProgress {
        self.store.user(id).await.unwrap()
    }

    async fn personal_task(&self, user_id: DbId) -> Task {
        self.store
            .create_task(
                user_id,
                "water plants",
                TaskCategory::Personal,
                TaskDifficulty::Easy,
                None,
            )
            .await
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_user_first_completion() {
    let h = harness();
    let user = h.store.create_user("ada").await;
    let task = h.personal_task(user.id).await;
    assert_eq!(task.reward.xp_value, 11);
    assert_eq!(task.reward.coins_value, 2);

    let now = at(10, 12);
    let outcome = h.engine.complete_task_at(user.id, task.id, now).await.unwrap();

    assert_eq!(outcome.xp_awarded, 11);
    assert_eq!(outcome.coins_awarded, 2);
    assert_eq!(outcome.reward.streak_bonus, 0);
    assert!(!outcome.level_up);
    assert_eq!(outcome.new_level, None);
    assert_eq!(outcome.new_achievements, vec!["First Steps".to_string()]);
    assert_eq!(outcome.task.state, TaskState::Completed { completed_at: now });

    let stored = h.user(user.id).await;
    assert_eq!(stored.streak, 1);
    assert_eq!(stored.last_active_date, Some(now));
    assert_eq!(stored.stats.total_tasks_completed, 1);
    // Task reward plus the First Steps reward.
    assert_eq!(stored.xp, 11 + 10);
    assert_eq!(stored.coins, 100 + 2 + 5);
    assert_eq!(outcome.user, stored);
}

#[tokio::test]
async fn long_streak_with_future_deadline() {
    let h = harness();
    let now = at(10, 12);
    let mut user = h.store.create_user("ada").await;
    user.streak = 10;
    user.stats.longest_streak = 10;
    user.last_active_date = Some(now - Duration::days(1));
    h.store.put_user(user.clone()).await;

    let task = h
        .store
        .create_task(
            user.id,
            "read paper",
            TaskCategory::Learning,
            TaskDifficulty::Hard,
            Some(now + Duration::days(1)),
        )
        .await;

    let outcome = h.engine.complete_task_at(user.id, task.id, now).await.unwrap();

    assert_eq!(outcome.reward.base_xp, 25);
    assert_eq!(outcome.reward.streak_bonus, 50);
    assert!(outcome.reward.early_bonus);
    assert_eq!(outcome.xp_awarded, 25 + 50 + 10);
    assert_eq!(outcome.coins_awarded, 5 + 2);

    let stored = h.user(user.id).await;
    assert_eq!(stored.streak, 11);
    assert_eq!(stored.stats.longest_streak, 11);
}

#[tokio::test]
async fn rookie_achiever_unlocks_on_tenth_completion() {
    let h = harness();
    let user = h.store.create_user("ada").await;

    for i in 0..9 {
        let task = h.personal_task(user.id).await;
        let outcome = h
            .engine
            .complete_task_at(user.id, task.id, at(10, 9 + i))
            .await
            .unwrap();
        assert!(!outcome
            .new_achievements
            .contains(&"Rookie Achiever".to_string()));
    }

    let task = h.personal_task(user.id).await;
    let outcome = h
        .engine
        .complete_task_at(user.id, task.id, at(10, 20))
        .await
        .unwrap();
    assert_eq!(outcome.new_achievements, vec!["Rookie Achiever".to_string()]);

    let stored = h.user(user.id).await;
    assert_eq!(stored.stats.total_tasks_completed, 10);
    assert!(stored.has_achievement(AchievementKey::RookieAchiever));
}

#[tokio::test]
async fn concurrent_duplicate_completion_rewards_once() {
    let h = harness();
    let user = h.store.create_user("ada").await;
    let task = h.personal_task(user.id).await;
    let now = at(10, 12);

    let (a, b) = tokio::join!(
        h.engine.complete_task_at(user.id, task.id, now),
        h.engine.complete_task_at(user.id, task.id, now),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_matches!(
        results.into_iter().find(|r| r.is_err()),
        Some(Err(ProgressionError::TaskUnavailable { task_id })) if task_id == task.id
    );

    let stored = h.user(user.id).await;
    assert_eq!(stored.xp, 11 + 10);
    assert_eq!(stored.stats.total_tasks_completed, 1);
}

// ---------------------------------------------------------------------------
// Preconditions and failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_completion_is_rejected_without_mutation() {
    let h = harness();
    let user = h.store.create_user("ada").await;
    let task = h.personal_task(user.id).await;

    h.engine.complete_task_at(user.id, task.id, at(10, 12)).await.unwrap();
    let before = h.user(user.id).await;
    let writes = h.store.write_count();
    h.publisher.take();

    let err = h
        .engine
        .complete_task_at(user.id, task.id, at(11, 12))
        .await
        .unwrap_err();
    assert_matches!(err, ProgressionError::TaskUnavailable { .. });
    assert_eq!(err.to_string(), "Task not found or already completed");

    assert_eq!(h.user(user.id).await, before);
    assert_eq!(h.store.write_count(), writes);
    assert!(h.publisher.take().is_empty());
}

#[tokio::test]
async fn missing_user_changes_nothing() {
    let h = harness();
    let owner = h.store.create_user("ada").await;
    let task = h.personal_task(owner.id).await;

    let err = h
        .engine
        .complete_task_at(999, task.id, at(10, 12))
        .await
        .unwrap_err();
    assert_matches!(err, ProgressionError::UserNotFound { user_id: 999 });
    assert_eq!(h.store.task(task.id).await.unwrap().state, TaskState::Pending);
}

#[tokio::test]
async fn cannot_complete_someone_elses_task() {
    let h = harness();
    let owner = h.store.create_user("ada").await;
    let other = h.store.create_user("grace").await;
    let task = h.personal_task(owner.id).await;

    let err = h
        .engine
        .complete_task_at(other.id, task.id, at(10, 12))
        .await
        .unwrap_err();
    assert_matches!(err, ProgressionError::TaskUnavailable { .. });
    assert_eq!(h.store.task(task.id).await.unwrap().state, TaskState::Pending);
}

#[tokio::test]
async fn failed_reward_write_leaves_task_completed() {
    let h = harness();
    let user = h.store.create_user("ada").await;
    let task = h.personal_task(user.id).await;
    h.store.fail_progress_writes(true);

    let err = h
        .engine
        .complete_task_at(user.id, task.id, at(10, 12))
        .await
        .unwrap_err();
    assert_matches!(err, ProgressionError::RewardsNotApplied { task_id, .. } if task_id == task.id);

    assert!(h.store.task(task.id).await.unwrap().is_completed());
    assert_eq!(h.user(user.id).await.xp, 0);
    assert!(h.publisher.take().is_empty());
}

#[tokio::test]
async fn failing_achievement_check_does_not_fail_completion() {
    let h = harness();
    h.store.fail_category_counts(true);
    let user = h.store.create_user("ada").await;
    let task = h.personal_task(user.id).await;

    let outcome = h
        .engine
        .complete_task_at(user.id, task.id, at(10, 12))
        .await
        .unwrap();
    assert_eq!(outcome.xp_awarded, 11);
    assert_eq!(outcome.new_achievements, vec!["First Steps".to_string()]);
}

// ---------------------------------------------------------------------------
// Streaks, levels and events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streak_counts_days_not_tasks() {
    let h = harness();
    let user = h.store.create_user("ada").await;

    for hour in [8, 13, 21] {
        let task = h.personal_task(user.id).await;
        h.engine
            .complete_task_at(user.id, task.id, at(10, hour))
            .await
            .unwrap();
    }
    assert_eq!(h.user(user.id).await.streak, 1);

    let task = h.personal_task(user.id).await;
    h.engine
        .complete_task_at(user.id, task.id, at(11, 9))
        .await
        .unwrap();
    assert_eq!(h.user(user.id).await.streak, 2);

    let task = h.personal_task(user.id).await;
    h.engine
        .complete_task_at(user.id, task.id, at(14, 9))
        .await
        .unwrap();
    let stored = h.user(user.id).await;
    assert_eq!(stored.streak, 1);
    assert_eq!(stored.stats.longest_streak, 2);
}

#[tokio::test]
async fn level_up_is_reported_and_published() {
    let h = harness();
    let mut user = h.store.create_user("ada").await;
    user.xp = 490;
    user.achievements.insert(AchievementKey::FirstSteps);
    h.store.put_user(user.clone()).await;
    let task = h.personal_task(user.id).await;

    let outcome = h
        .engine
        .complete_task_at(user.id, task.id, at(10, 12))
        .await
        .unwrap();
    assert!(outcome.level_up);
    assert_eq!(outcome.new_level, Some(2));
    assert_eq!(h.user(user.id).await.level, 2);

    let level_ups: Vec<_> = h
        .publisher
        .take()
        .into_iter()
        .filter_map(|(_, e)| match e {
            ProgressionEvent::LevelUp {
                previous_level,
                new_level,
            } => Some((previous_level, new_level)),
            _ => None,
        })
        .collect();
    assert_eq!(level_ups, vec![(1, 2)]);
}

#[tokio::test]
async fn completion_events_in_order() {
    let h = harness();
    let user = h.store.create_user("ada").await;
    let task = h.personal_task(user.id).await;

    h.engine
        .complete_task_at(user.id, task.id, at(10, 12))
        .await
        .unwrap();

    assert_eq!(
        h.publisher.event_types(Topic::User(user.id)),
        vec![
            "task-completed",
            "xp-gained",
            "coins-earned",
            "achievement-unlocked"
        ]
    );
    assert_eq!(
        h.publisher.event_types(Topic::Leaderboard),
        vec!["leaderboard-update"]
    );
}

#[tokio::test]
async fn late_completion_unlocks_night_owl() {
    let h = harness();
    let user = h.store.create_user("ada").await;
    let task = h.personal_task(user.id).await;

    let outcome = h
        .engine
        .complete_task_at(user.id, task.id, at(10, 23))
        .await
        .unwrap();
    assert!(outcome.new_achievements.contains(&"Night Owl".to_string()));
    assert!(!outcome.new_achievements.contains(&"Early Bird".to_string()));
}

// ---------------------------------------------------------------------------
// Focus sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn focus_session_awards_minutes() {
    let h = harness();
    let user = h.store.create_user("ada").await;

    let outcome = h
        .engine
        .complete_focus_session_at(user.id, 25, at(10, 12))
        .await
        .unwrap();
    assert_eq!(outcome.xp_awarded, 25);
    assert_eq!(outcome.coins_awarded, 2);

    let stored = h.user(user.id).await;
    assert_eq!(stored.stats.total_focus_minutes, 25);
    assert_eq!(stored.stats.total_tasks_completed, 0);
    assert_eq!(stored.streak, 1);
    assert_eq!(
        h.publisher.event_types(Topic::User(user.id)),
        vec!["focus-completed", "xp-gained", "coins-earned"]
    );
}

#[tokio::test]
async fn focus_time_achievement_unlocks_at_threshold() {
    let h = harness();
    let mut user = h.store.create_user("ada").await;
    user.stats.total_focus_minutes = 590;
    h.store.put_user(user.clone()).await;

    let outcome = h
        .engine
        .complete_focus_session_at(user.id, 10, at(10, 12))
        .await
        .unwrap();
    assert_eq!(outcome.new_achievements, vec!["Deep Focus".to_string()]);
}

#[tokio::test]
async fn focus_session_rejects_out_of_range_minutes() {
    let h = harness();
    let user = h.store.create_user("ada").await;

    for minutes in [0, -5, 481] {
        let err = h
            .engine
            .complete_focus_session_at(user.id, minutes, at(10, 12))
            .await
            .unwrap_err();
        assert_matches!(err, ProgressionError::InvalidFocusSession(_));
    }
    assert_eq!(h.user(user.id).await.xp, 0);
}
