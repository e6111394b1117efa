//! XP to level mapping.
//!
//! Advancing from level `k` to `k + 1` costs `500 + 100 * (k - 1)^2` XP, so
//! the per-level requirement starts at 500 and accelerates quadratically.
//! `level` is always derived from `xp` through [`level_for_xp`]; it is never
//! set independently.

use serde::{Deserialize, Serialize};

/// Flat per-level XP requirement.
pub const LEVEL_BASE_XP: i64 = 500;
/// Coefficient of the quadratic term of the per-level requirement.
pub const LEVEL_QUADRATIC_XP: i64 = 100;
/// Highest reachable level.
pub const MAX_LEVEL: i32 = 100;

/// XP needed to advance from `level` to `level + 1`.
pub fn xp_to_advance(level: i32) -> i64 {
    let k = i64::from(level.max(1)) - 1;
    LEVEL_BASE_XP + LEVEL_QUADRATIC_XP * k * k
}

/// Cumulative XP at which `level` is reached. Level 1 starts at 0.
pub fn xp_threshold(level: i32) -> i64 {
    (1..level.clamp(1, MAX_LEVEL)).map(xp_to_advance).sum()
}

/// The largest level whose threshold does not exceed `xp`.
pub fn level_for_xp(xp: i64) -> i32 {
    let mut level = 1;
    let mut next_threshold = xp_to_advance(1);
    while level < MAX_LEVEL && xp >= next_threshold {
        level += 1;
        next_threshold += xp_to_advance(level);
    }
    level
}

/// Progress within the current level, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: i32,
    pub xp: i64,
    /// XP earned since reaching `level`.
    pub xp_in_level: i64,
    /// XP required to go from `level` to the next one (0 at max level).
    pub xp_for_level: i64,
    /// 0.0 ..= 100.0
    pub percentage: f64,
    pub is_max_level: bool,
}

pub fn level_progress(xp: i64) -> LevelProgress {
    let xp = xp.max(0);
    let level = level_for_xp(xp);
    let is_max_level = level >= MAX_LEVEL;
    let xp_in_level = xp - xp_threshold(level);
    let xp_for_level = if is_max_level { 0 } else { xp_to_advance(level) };

    let percentage = if xp_for_level > 0 {
        (xp_in_level as f64 / xp_for_level as f64 * 100.0).min(100.0)
    } else {
        100.0
    };

    LevelProgress {
        level,
        xp,
        xp_in_level,
        xp_for_level,
        percentage,
        is_max_level,
    }
}
