//! Real-time fan-out seam.
//!
//! The engine announces what happened through an injected
//! [`EventPublisher`]. Publishing is fire-and-forget: it cannot fail from
//! the caller's point of view, and delivery, ordering across topics and the
//! presence of subscribers are the transport's concern.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementKey, AchievementReward};
use crate::rewards::CompletionReward;
use crate::types::DbId;

/// Where an event is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Topic {
    /// Personal events for one user.
    User(DbId),
    /// Rank-affecting broadcasts shared by everyone.
    Leaderboard,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Leaderboard => f.write_str("leaderboard"),
        }
    }
}

/// Events emitted by the progression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ProgressionEvent {
    TaskCompleted {
        task_id: DbId,
        title: String,
        reward: CompletionReward,
    },
    XpGained {
        amount: i64,
        total: i64,
    },
    CoinsEarned {
        amount: i64,
        total: i64,
    },
    LevelUp {
        previous_level: i32,
        new_level: i32,
    },
    AchievementUnlocked {
        key: AchievementKey,
        name: String,
        reward: AchievementReward,
    },
    FocusCompleted {
        minutes: i32,
    },
    LeaderboardUpdate {
        user_id: DbId,
        username: String,
        xp: i64,
        level: i32,
    },
}

impl ProgressionEvent {
    /// Wire name, matching the serialized `event` tag.
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::TaskCompleted { .. } => "task-completed",
            Self::XpGained { .. } => "xp-gained",
            Self::CoinsEarned { .. } => "coins-earned",
            Self::LevelUp { .. } => "level-up",
            Self::AchievementUnlocked { .. } => "achievement-unlocked",
            Self::FocusCompleted { .. } => "focus-completed",
            Self::LeaderboardUpdate { .. } => "leaderboard-update",
        }
    }
}

/// `publish(topic, payload)` capability. Implementations must not panic and
/// must swallow (and log) their own failures.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: Topic, event: ProgressionEvent);
}

/// Publisher that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _topic: Topic, _event: ProgressionEvent) {}
}
