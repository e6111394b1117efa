//! Completion-time reward calculation.
//!
//! Pure and deterministic: the same task, streak and completion time always
//! produce the same reward. The streak used is the user's streak *before*
//! the completion updates it.

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::types::Timestamp;

/// Extra XP per day of current streak.
pub const STREAK_BONUS_PER_DAY: i64 = 5;
/// Upper bound on the streak bonus.
pub const MAX_STREAK_BONUS: i64 = 50;
/// XP added when a task is completed strictly before its deadline.
pub const EARLY_COMPLETION_XP: i64 = 10;
/// Coins added when a task is completed strictly before its deadline.
pub const EARLY_COMPLETION_COINS: i64 = 2;

/// XP per minute of a completed focus session.
pub const FOCUS_XP_PER_MINUTE: i64 = 1;
/// One coin per this many focus minutes.
pub const FOCUS_MINUTES_PER_COIN: i64 = 10;
/// Longest focus session accepted in one request.
pub const MAX_FOCUS_MINUTES: i32 = 480;

/// Breakdown of what a single completion awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReward {
    pub xp: i64,
    pub coins: i64,
    pub base_xp: i64,
    pub base_coins: i64,
    pub streak_bonus: i64,
    pub early_bonus: bool,
}

/// Streak bonus for a given (pre-update) streak, capped at [`MAX_STREAK_BONUS`].
pub fn streak_bonus(streak: i32) -> i64 {
    (i64::from(streak.max(0)) * STREAK_BONUS_PER_DAY).min(MAX_STREAK_BONUS)
}

/// Whether `completed_at` lies strictly before an existing deadline.
///
/// There is no symmetric penalty for completing after the deadline.
pub fn is_early(deadline: Option<Timestamp>, completed_at: Timestamp) -> bool {
    deadline.is_some_and(|deadline| completed_at < deadline)
}

/// Compute the reward for completing `task` at `completed_at` with the
/// user's current `streak`.
pub fn completion_reward(task: &Task, streak: i32, completed_at: Timestamp) -> CompletionReward {
    let bonus = streak_bonus(streak);
    let early = is_early(task.deadline, completed_at);

    let mut xp = task.reward.xp_value + bonus;
    let mut coins = task.reward.coins_value;
    if early {
        xp += EARLY_COMPLETION_XP;
        coins += EARLY_COMPLETION_COINS;
    }

    CompletionReward {
        xp,
        coins,
        base_xp: task.reward.xp_value,
        base_coins: task.reward.coins_value,
        streak_bonus: bonus,
        early_bonus: early,
    }
}

/// XP and coins for a focus session of `minutes`.
pub fn focus_reward(minutes: i32) -> (i64, i64) {
    let minutes = i64::from(minutes.max(0));
    (
        minutes * FOCUS_XP_PER_MINUTE,
        minutes / FOCUS_MINUTES_PER_COIN,
    )
}
