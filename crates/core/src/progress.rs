//! Per-user progression state and the atomic deltas applied to it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::achievements::AchievementKey;
use crate::leveling::level_for_xp;
use crate::streak::StreakUpdate;
use crate::types::{DbId, Timestamp};

/// Coins granted when a progression record is created.
pub const STARTING_COINS: i64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_tasks_completed: i64,
    pub longest_streak: i32,
    pub total_focus_minutes: i64,
}

/// A user's progression record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: DbId,
    pub username: String,
    pub xp: i64,
    pub coins: i64,
    /// Always `level_for_xp(xp)`; kept denormalised for ranking queries.
    pub level: i32,
    pub streak: i32,
    pub last_active_date: Option<Timestamp>,
    pub stats: UserStats,
    pub achievements: BTreeSet<AchievementKey>,
}

impl UserProgress {
    /// A freshly registered user.
    pub fn new(id: DbId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            xp: 0,
            coins: STARTING_COINS,
            level: 1,
            streak: 0,
            last_active_date: None,
            stats: UserStats::default(),
            achievements: BTreeSet::new(),
        }
    }

    pub fn has_achievement(&self, key: AchievementKey) -> bool {
        self.achievements.contains(&key)
    }

    /// Apply `delta` in place, recomputing the level from the new xp.
    ///
    /// Stores that can express increments natively do the same arithmetic in
    /// a single statement; this is the reference behaviour.
    pub fn apply(&mut self, delta: &ProgressDelta) {
        self.xp = (self.xp + delta.xp).max(0);
        self.coins = (self.coins + delta.coins).max(0);
        self.stats.total_tasks_completed += delta.tasks_completed;
        self.stats.total_focus_minutes += delta.focus_minutes;
        if let Some(streak) = &delta.streak {
            self.streak = streak.streak;
            self.last_active_date = Some(streak.last_active_date);
        }
        self.stats.longest_streak = self.stats.longest_streak.max(self.streak);
        self.level = level_for_xp(self.xp);
    }
}

/// New streak values to assign together with an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakAssignment {
    pub streak: i32,
    pub last_active_date: Timestamp,
}

/// Increments applied to a user in one atomic write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressDelta {
    pub xp: i64,
    pub coins: i64,
    pub tasks_completed: i64,
    pub focus_minutes: i64,
    /// `None` leaves `streak` / `last_active_date` untouched.
    pub streak: Option<StreakAssignment>,
}

impl ProgressDelta {
    /// Attach the outcome of a streak transition. Same-day outcomes assign
    /// nothing.
    pub fn with_streak(mut self, update: &StreakUpdate) -> Self {
        self.streak = update
            .last_active_date
            .map(|last_active_date| StreakAssignment {
                streak: update.streak,
                last_active_date,
            });
        self
    }
}
