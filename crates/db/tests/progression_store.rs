//! Integration tests for the repositories and `PgProgressionStore`.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use levelup_core::achievements::{catalog, AchievementKey, TimeOfDay};
use levelup_core::events::NoopPublisher;
use levelup_core::progress::{ProgressDelta, UserProgress};
use levelup_core::store::ProgressionStore;
use levelup_core::task::{Task, TaskCategory, TaskDifficulty, TaskReward, TaskState};
use levelup_core::types::DbId;
use levelup_core::{ProgressionEngine, ProgressionError};
use levelup_db::models::task::{CreateTask, UpdateTask};
use levelup_db::models::user::CreateUser;
use levelup_db::repositories::{AchievementRepo, TaskRepo, UserRepo};
use levelup_db::PgProgressionStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seeded_user(pool: &PgPool, username: &str) -> UserProgress {
    AchievementRepo::seed(pool, &catalog()).await.unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
        },
    )
    .await
    .unwrap()
    .into()
}

fn new_task(category: TaskCategory, difficulty: TaskDifficulty) -> CreateTask {
    CreateTask {
        title: "write tests".to_string(),
        description: None,
        category,
        difficulty,
        deadline: None,
    }
}

async fn create_task(pool: &PgPool, user_id: DbId, category: TaskCategory) -> Task {
    TaskRepo::create(pool, user_id, &new_task(category, TaskDifficulty::Easy))
        .await
        .unwrap()
        .try_into()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_new_user_gets_starting_grant(pool: PgPool) {
    let user = seeded_user(&pool, "ada").await;
    assert_eq!(user.xp, 0);
    assert_eq!(user.coins, 100);
    assert_eq!(user.level, 1);
    assert!(user.achievements.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_task_reward_is_frozen_and_recomputed_on_edit(pool: PgPool) {
    let user = seeded_user(&pool, "ada").await;
    let task = create_task(&pool, user.id, TaskCategory::Work).await;
    assert_eq!(task.reward.xp_value, 12);
    assert_eq!(task.reward.coins_value, 2);
    assert_eq!(task.state, TaskState::Pending);

    let edit = UpdateTask {
        category: Some(TaskCategory::Learning),
        difficulty: Some(TaskDifficulty::Hard),
        ..UpdateTask::default()
    };
    let updated: Task = TaskRepo::update(&pool, task.id, user.id, &edit)
        .await
        .unwrap()
        .unwrap()
        .try_into()
        .unwrap();
    assert_eq!(updated.category, TaskCategory::Learning);
    assert_eq!(updated.reward.xp_value, 25);
    assert_eq!(updated.reward.coins_value, 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_edits_keep_reward_in_line_with_category_and_difficulty(pool: PgPool) {
    let user = seeded_user(&pool, "ada").await;
    let task = create_task(&pool, user.id, TaskCategory::Work).await;

    let harder = UpdateTask {
        difficulty: Some(TaskDifficulty::Hard),
        ..UpdateTask::default()
    };
    let learning = UpdateTask {
        category: Some(TaskCategory::Learning),
        ..UpdateTask::default()
    };
    let (a, b) = tokio::join!(
        TaskRepo::update(&pool, task.id, user.id, &harder),
        TaskRepo::update(&pool, task.id, user.id, &learning),
    );
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    let stored: Task = TaskRepo::find_for_user(&pool, task.id, user.id)
        .await
        .unwrap()
        .unwrap()
        .try_into()
        .unwrap();
    assert_eq!(stored.category, TaskCategory::Learning);
    assert_eq!(stored.difficulty, TaskDifficulty::Hard);
    assert_eq!(
        stored.reward,
        TaskReward::for_task(TaskCategory::Learning, TaskDifficulty::Hard)
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_null_clears_description_and_deadline(pool: PgPool) {
    let user = seeded_user(&pool, "ada").await;
    let mut input = new_task(TaskCategory::Personal, TaskDifficulty::Easy);
    input.description = Some("buy milk".into());
    input.deadline = Some(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap());
    let task = TaskRepo::create(&pool, user.id, &input).await.unwrap();

    let rename = UpdateTask {
        title: Some("groceries".into()),
        ..UpdateTask::default()
    };
    let kept = TaskRepo::update(&pool, task.id, user.id, &rename)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.description.as_deref(), Some("buy milk"));
    assert!(kept.deadline.is_some());

    let clear = UpdateTask {
        description: Some(None),
        deadline: Some(None),
        ..UpdateTask::default()
    };
    let cleared = TaskRepo::update(&pool, task.id, user.id, &clear)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.title, "groceries");
    assert_eq!(cleared.description, None);
    assert_eq!(cleared.deadline, None);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_completed_task_cannot_be_edited_or_completed_again(pool: PgPool) {
    let user = seeded_user(&pool, "ada").await;
    let task = create_task(&pool, user.id, TaskCategory::Personal).await;
    let now = Utc::now();

    let first = TaskRepo::complete_if_open(&pool, task.id, user.id, now)
        .await
        .unwrap();
    assert!(first.is_some());
    let second = TaskRepo::complete_if_open(&pool, task.id, user.id, now)
        .await
        .unwrap();
    assert!(second.is_none());

    let edit = UpdateTask {
        title: Some("renamed".into()),
        ..UpdateTask::default()
    };
    let updated = TaskRepo::update(&pool, task.id, user.id, &edit)
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_start_only_from_pending(pool: PgPool) {
    let user = seeded_user(&pool, "ada").await;
    let task = create_task(&pool, user.id, TaskCategory::Other).await;

    let started = TaskRepo::start(&pool, task.id, user.id).await.unwrap().unwrap();
    assert_eq!(started.status, "in_progress");
    assert!(TaskRepo::start(&pool, task.id, user.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_count_completed_by_category(pool: PgPool) {
    let user = seeded_user(&pool, "ada").await;
    let now = Utc::now();
    for category in [TaskCategory::Work, TaskCategory::Work, TaskCategory::Health] {
        let task = create_task(&pool, user.id, category).await;
        TaskRepo::complete_if_open(&pool, task.id, user.id, now)
            .await
            .unwrap();
    }
    create_task(&pool, user.id, TaskCategory::Work).await;

    let total = TaskRepo::count_completed(&pool, user.id, None).await.unwrap();
    let work = TaskRepo::count_completed(&pool, user.id, Some(TaskCategory::Work))
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(work, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_count_completed_in_time_of_day_window(pool: PgPool) {
    let store = PgProgressionStore::new(pool.clone());
    let user = seeded_user(&pool, "ada").await;
    let day = |hour| Utc.with_ymd_and_hms(2026, 5, 4, hour, 30, 0).unwrap();

    for hour in [0, 7, 8, 21, 22, 23] {
        let task = create_task(&pool, user.id, TaskCategory::Health).await;
        TaskRepo::complete_if_open(&pool, task.id, user.id, day(hour))
            .await
            .unwrap()
            .unwrap();
    }
    // Open tasks never count.
    create_task(&pool, user.id, TaskCategory::Health).await;

    let early = store
        .count_completed_in_window(user.id, TimeOfDay::Early)
        .await
        .unwrap();
    let late = store
        .count_completed_in_window(user.id, TimeOfDay::Late)
        .await
        .unwrap();
    assert_eq!(early, 2);
    assert_eq!(late, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_leaderboard_orders_by_xp_then_id(pool: PgPool) {
    let store = PgProgressionStore::new(pool.clone());
    let ada = seeded_user(&pool, "ada").await;
    let grace = seeded_user(&pool, "grace").await;
    let linus = seeded_user(&pool, "linus").await;

    for (id, xp) in [(ada.id, 50), (grace.id, 300), (linus.id, 50)] {
        store
            .apply_progress(
                id,
                &ProgressDelta {
                    xp,
                    ..ProgressDelta::default()
                },
            )
            .await
            .unwrap();
    }

    let board = UserRepo::leaderboard(&pool, 10).await.unwrap();
    let names: Vec<_> = board.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["grace", "ada", "linus"]);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[2].rank, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_seed_is_idempotent_and_keeps_is_active(pool: PgPool) {
    AchievementRepo::seed(&pool, &catalog()).await.unwrap();
    sqlx::query("UPDATE achievements SET is_active = FALSE WHERE key = $1")
        .bind(AchievementKey::NightOwl.as_str())
        .execute(&pool)
        .await
        .unwrap();
    AchievementRepo::seed(&pool, &catalog()).await.unwrap();

    let all: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM achievements")
        .fetch_one(&pool)
        .await
        .unwrap();
    let active = AchievementRepo::list_active(&pool).await.unwrap();
    assert_eq!(all, catalog().len() as i64);
    assert_eq!(active.len(), catalog().len() - 1);
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_apply_progress_recomputes_level(pool: PgPool) {
    let store = PgProgressionStore::new(pool.clone());
    let user = seeded_user(&pool, "ada").await;
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

    let delta = ProgressDelta {
        xp: 1_200,
        coins: 3,
        tasks_completed: 1,
        ..ProgressDelta::default()
    }
    .with_streak(&levelup_core::streak::advance_streak(None, 0, 0, now));
    let updated = store.apply_progress(user.id, &delta).await.unwrap().unwrap();

    assert_eq!(updated.xp, 1_200);
    assert_eq!(updated.level, 3);
    assert_eq!(updated.streak, 1);
    assert_eq!(updated.stats.longest_streak, 1);
    assert_eq!(updated.last_active_date, Some(now));

    let reloaded = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded, updated);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_grant_achievement_only_once(pool: PgPool) {
    let store = PgProgressionStore::new(pool.clone());
    let user = seeded_user(&pool, "ada").await;
    let first_steps = catalog()
        .into_iter()
        .find(|d| d.key == AchievementKey::FirstSteps)
        .unwrap();
    let now = Utc::now();

    let granted = store
        .grant_achievement(user.id, &first_steps, now)
        .await
        .unwrap()
        .unwrap();
    assert!(granted.has_achievement(AchievementKey::FirstSteps));
    assert_eq!(granted.xp, 10);

    let again = store
        .grant_achievement(user.id, &first_steps, now)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(store.find_user(user.id).await.unwrap().unwrap().xp, 10);

    let progress = AchievementRepo::list_progress(&pool, user.id).await.unwrap();
    assert_eq!(progress.len(), 1);
    assert!(progress[0].is_unlocked);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_recorded_progress_never_decreases(pool: PgPool) {
    let store = PgProgressionStore::new(pool.clone());
    let user = seeded_user(&pool, "ada").await;
    let now = Utc::now();

    let record = store
        .record_achievement_progress(user.id, AchievementKey::DeepFocus, 400, now)
        .await
        .unwrap();
    assert_eq!(record.progress, 400);

    let record = store
        .record_achievement_progress(
            user.id,
            AchievementKey::DeepFocus,
            250,
            now + Duration::minutes(1),
        )
        .await
        .unwrap();
    assert_eq!(record.progress, 400);
    assert_eq!(record.history.len(), 1);
}

// ---------------------------------------------------------------------------
// Engine against Postgres
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_completion_rewards_once(pool: PgPool) {
    let store = Arc::new(PgProgressionStore::new(pool.clone()));
    let engine = Arc::new(ProgressionEngine::new(store, Arc::new(NoopPublisher)));
    let user = seeded_user(&pool, "ada").await;
    let task = create_task(&pool, user.id, TaskCategory::Personal).await;
    let (user_id, task_id) = (user.id, task.id);
    let noon = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

    let a = tokio::spawn({
        let engine = engine.clone();
        async move { engine.complete_task_at(user_id, task_id, noon).await }
    });
    let b = tokio::spawn({
        let engine = engine.clone();
        async move { engine.complete_task_at(user_id, task_id, noon).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ProgressionError::TaskUnavailable { .. }))));

    let stored = UserRepo::find_by_id(&pool, user_id).await.unwrap().unwrap();
    assert_eq!(stored.total_tasks_completed, 1);
    // Task reward (11) plus First Steps (10).
    assert_eq!(stored.xp, 21);
    assert_eq!(stored.achievements, vec!["first_steps".to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_completion_for_unknown_user_leaves_task_open(pool: PgPool) {
    let store = Arc::new(PgProgressionStore::new(pool.clone()));
    let engine = ProgressionEngine::new(store, Arc::new(NoopPublisher));
    let user = seeded_user(&pool, "ada").await;
    let task = create_task(&pool, user.id, TaskCategory::Personal).await;

    let err = engine.complete_task(user.id + 1000, task.id).await.unwrap_err();
    assert_matches!(err, ProgressionError::UserNotFound { .. });

    let row = TaskRepo::find_for_user(&pool, task.id, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "pending");
}
