//! Task domain types and creation-time reward assignment.
//!
//! A task's reward (`xp_value` / `coins_value`) is computed once from its
//! category and difficulty when the task is created and then frozen. Editing
//! either attribute recomputes it; nothing else does.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Reward constants
// ---------------------------------------------------------------------------

/// Base XP before the difficulty multiplier and category bonus are applied.
pub const BASE_TASK_XP: i64 = 10;

/// One coin is awarded for every this many XP of task value.
pub const XP_PER_COIN: i64 = 5;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Task category. Drives the category bonus and `category_tasks` achievements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Work,
    Personal,
    Health,
    Learning,
    Other,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        Self::Work,
        Self::Personal,
        Self::Health,
        Self::Learning,
        Self::Other,
    ];

    /// Flat XP bonus added after the difficulty multiplier.
    pub const fn xp_bonus(self) -> i64 {
        match self {
            Self::Work => 2,
            Self::Personal => 1,
            Self::Health => 3,
            Self::Learning => 5,
            Self::Other => 0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Health => "health",
            Self::Learning => "learning",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown task category '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Task difficulty. Scales the base XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskDifficulty {
    Easy,
    Medium,
    Hard,
}

impl TaskDifficulty {
    pub const ALL: [TaskDifficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Difficulty multiplier expressed in percent (1.0x = 100).
    ///
    /// Integer percent keeps the reward formula exact; `floor(10 * 1.5)`
    /// and `10 * 150 / 100` agree for every base value used here.
    pub const fn multiplier_percent(self) -> i64 {
        match self {
            Self::Easy => 100,
            Self::Medium => 150,
            Self::Hard => 200,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for TaskDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskDifficulty {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown task difficulty '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Frozen reward
// ---------------------------------------------------------------------------

/// The reward value frozen onto a task at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReward {
    pub xp_value: i64,
    pub coins_value: i64,
}

impl TaskReward {
    /// `xp = floor(10 * multiplier + category_bonus)`, `coins = floor(xp / 5)`.
    pub const fn for_task(category: TaskCategory, difficulty: TaskDifficulty) -> Self {
        let xp_value = BASE_TASK_XP * difficulty.multiplier_percent() / 100 + category.xp_bonus();
        Self {
            xp_value,
            coins_value: xp_value / XP_PER_COIN,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle state
// ---------------------------------------------------------------------------

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";

/// Task lifecycle. `Completed` carries its completion time, so a completed
/// task without a timestamp (or the reverse) cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InProgress,
    Completed { completed_at: Timestamp },
}

impl TaskState {
    /// Rebuild the state from its persisted `(status, completed_at)` columns.
    pub fn from_parts(status: &str, completed_at: Option<Timestamp>) -> Result<Self, CoreError> {
        match (status, completed_at) {
            (STATUS_PENDING, None) => Ok(Self::Pending),
            (STATUS_IN_PROGRESS, None) => Ok(Self::InProgress),
            (STATUS_COMPLETED, Some(at)) => Ok(Self::Completed { completed_at: at }),
            (STATUS_COMPLETED, None) => Err(CoreError::Internal(
                "completed task is missing completed_at".into(),
            )),
            (other, Some(_)) if other != STATUS_COMPLETED => Err(CoreError::Internal(format!(
                "task in status '{other}' carries completed_at"
            ))),
            (other, _) => Err(CoreError::Internal(format!("unknown task status '{other}'"))),
        }
    }

    pub const fn status_str(&self) -> &'static str {
        match self {
            Self::Pending => STATUS_PENDING,
            Self::InProgress => STATUS_IN_PROGRESS,
            Self::Completed { .. } => STATUS_COMPLETED,
        }
    }

    pub const fn completed_at(&self) -> Option<Timestamp> {
        match self {
            Self::Completed { completed_at } => Some(*completed_at),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A user's task as seen by the progression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub difficulty: TaskDifficulty,
    #[serde(flatten)]
    pub reward: TaskReward,
    pub deadline: Option<Timestamp>,
    #[serde(flatten)]
    pub state: TaskState,
    pub created_at: Timestamp,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        matches!(self.state, TaskState::Completed { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
