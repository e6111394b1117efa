//! Daily streak transitions.
//!
//! Streaks are counted in UTC calendar days, not elapsed hours: activity at
//! 23:59 and again at 00:01 the next day extends the streak.

use serde::Serialize;

use crate::types::Timestamp;

/// Which branch the streak transition took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakOutcome {
    /// Already active today; nothing changes.
    SameDay,
    /// Last activity was yesterday; streak grows by one.
    Extended,
    /// First activity ever or a gap of two or more days; streak restarts at 1.
    Reset,
}

/// Result of applying a qualifying action to a user's streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakUpdate {
    pub outcome: StreakOutcome,
    pub streak: i32,
    pub longest_streak: i32,
    /// New `last_active_date`; `None` on the same-day branch, which leaves
    /// the stored value untouched.
    pub last_active_date: Option<Timestamp>,
}

impl StreakUpdate {
    pub fn changed(&self) -> bool {
        self.outcome != StreakOutcome::SameDay
    }
}

/// Apply a qualifying action at `now` to the given streak state.
///
/// A `last_active` later than `now` (clock skew between writers) is treated
/// like same-day activity rather than breaking the streak.
pub fn advance_streak(
    last_active: Option<Timestamp>,
    streak: i32,
    longest_streak: i32,
    now: Timestamp,
) -> StreakUpdate {
    let today = now.date_naive();

    let outcome = match last_active.map(|t| (today - t.date_naive()).num_days()) {
        Some(days) if days <= 0 => StreakOutcome::SameDay,
        Some(1) => StreakOutcome::Extended,
        _ => StreakOutcome::Reset,
    };

    let (streak, last_active_date) = match outcome {
        StreakOutcome::SameDay => (streak, None),
        StreakOutcome::Extended => (streak.saturating_add(1), Some(now)),
        StreakOutcome::Reset => (1, Some(now)),
    };

    StreakUpdate {
        outcome,
        streak,
        longest_streak: longest_streak.max(streak),
        last_active_date,
    }
}
