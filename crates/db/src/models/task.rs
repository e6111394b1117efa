//! Task rows and DTOs.

use levelup_core::error::CoreError;
use levelup_core::task::{Task, TaskCategory, TaskDifficulty, TaskReward, TaskState};
use levelup_core::types::{DbId, Timestamp};
use serde::{Deserialize, Deserializer};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Full row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub xp_value: i64,
    pub coins_value: i64,
    pub deadline: Option<Timestamp>,
    pub status: String,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<TaskRow> for Task {
    type Error = CoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            category: row.category.parse()?,
            difficulty: row.difficulty.parse()?,
            reward: TaskReward {
                xp_value: row.xp_value,
                coins_value: row.coins_value,
            },
            deadline: row.deadline,
            state: TaskState::from_parts(&row.status, row.completed_at)?,
            created_at: row.created_at,
        })
    }
}

/// DTO for creating a task. The reward is derived, not supplied.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTask {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category: TaskCategory,
    pub difficulty: TaskDifficulty,
    pub deadline: Option<Timestamp>,
}

/// DTO for editing a task. All fields are optional.
///
/// `description` and `deadline` use `Option<Option<T>>`: an absent field
/// keeps the stored value, an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "description_within_limit"))]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub category: Option<TaskCategory>,
    pub difficulty: Option<TaskDifficulty>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<Timestamp>>,
}

impl UpdateTask {
    /// Whether this edit changes what the task is worth.
    fn changes_reward(&self, current: &Task) -> bool {
        self.category.is_some_and(|c| c != current.category)
            || self.difficulty.is_some_and(|d| d != current.difficulty)
    }

    /// Reward after applying this edit to `current`.
    pub fn reward_for(&self, current: &Task) -> TaskReward {
        if !self.changes_reward(current) {
            return current.reward;
        }
        TaskReward::for_task(
            self.category.unwrap_or(current.category),
            self.difficulty.unwrap_or(current.difficulty),
        )
    }
}

/// Deserialize a present field, keeping `null` as `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn description_within_limit(input: &UpdateTask) -> Result<(), ValidationError> {
    match input.description.as_ref().and_then(|d| d.as_deref()) {
        Some(description) if description.chars().count() > 2000 => Err(ValidationError::new(
            "length",
        )
        .with_message("description must be at most 2000 characters".into())),
        _ => Ok(()),
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}
