//! Achievement definitions, criteria and per-user progress records.
//!
//! Achievements are identified by [`AchievementKey`], a closed enum. Stored
//! definitions and unlocked sets carry the key's wire name; anything that
//! does not parse back into a key is ignored at the storage boundary.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::task::{Task, TaskCategory};
use crate::types::Timestamp;

/// Completions before this UTC hour count as early-bird completions.
pub const EARLY_HOUR_CUTOFF: u32 = 8;
/// Completions at or after this UTC hour count as night-owl completions.
pub const LATE_HOUR_START: u32 = 22;
/// History entries kept per progress record; older entries are dropped.
pub const MAX_HISTORY_ENTRIES: usize = 50;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKey {
    FirstSteps,
    RookieAchiever,
    TaskMaster,
    Centurion,
    StreakStarter,
    WeekWarrior,
    Unstoppable,
    Workhorse,
    HealthNut,
    Scholar,
    EarlyBird,
    NightOwl,
    DeepFocus,
    FocusMarathon,
}

impl AchievementKey {
    pub const ALL: [AchievementKey; 14] = [
        Self::FirstSteps,
        Self::RookieAchiever,
        Self::TaskMaster,
        Self::Centurion,
        Self::StreakStarter,
        Self::WeekWarrior,
        Self::Unstoppable,
        Self::Workhorse,
        Self::HealthNut,
        Self::Scholar,
        Self::EarlyBird,
        Self::NightOwl,
        Self::DeepFocus,
        Self::FocusMarathon,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstSteps => "first_steps",
            Self::RookieAchiever => "rookie_achiever",
            Self::TaskMaster => "task_master",
            Self::Centurion => "centurion",
            Self::StreakStarter => "streak_starter",
            Self::WeekWarrior => "week_warrior",
            Self::Unstoppable => "unstoppable",
            Self::Workhorse => "workhorse",
            Self::HealthNut => "health_nut",
            Self::Scholar => "scholar",
            Self::EarlyBird => "early_bird",
            Self::NightOwl => "night_owl",
            Self::DeepFocus => "deep_focus",
            Self::FocusMarathon => "focus_marathon",
        }
    }
}

impl fmt::Display for AchievementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown achievement key '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Milestone,
    Consistency,
    Specialist,
    Timing,
    Focus,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 5] = [
        Self::Milestone,
        Self::Consistency,
        Self::Specialist,
        Self::Timing,
        Self::Focus,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Milestone => "milestone",
            Self::Consistency => "consistency",
            Self::Specialist => "specialist",
            Self::Timing => "timing",
            Self::Focus => "focus",
        }
    }
}

impl FromStr for AchievementCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown achievement category '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl FromStr for Rarity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown rarity '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// What has to be measured, and how much of it, to unlock an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criteria {
    /// Total completed tasks.
    TaskCount { target: i64 },
    /// Current daily streak.
    Streak { target: i64 },
    /// Completed tasks in one category (needs a count query).
    CategoryTasks { category: TaskCategory, target: i64 },
    /// Total focus minutes.
    FocusTime { target: i64 },
    /// Completions before [`EARLY_HOUR_CUTOFF`]; only measured when the
    /// just-completed task falls in the window.
    EarlyCompletion { target: i64 },
    /// Completions at or after [`LATE_HOUR_START`]; only measured when the
    /// just-completed task falls in the window.
    LateCompletion { target: i64 },
}

impl Criteria {
    pub const fn target(&self) -> i64 {
        match *self {
            Self::TaskCount { target }
            | Self::Streak { target }
            | Self::CategoryTasks { target, .. }
            | Self::FocusTime { target }
            | Self::EarlyCompletion { target }
            | Self::LateCompletion { target } => target,
        }
    }

    pub const fn type_str(&self) -> &'static str {
        match self {
            Self::TaskCount { .. } => "task_count",
            Self::Streak { .. } => "streak",
            Self::CategoryTasks { .. } => "category_tasks",
            Self::FocusTime { .. } => "focus_time",
            Self::EarlyCompletion { .. } => "early_completion",
            Self::LateCompletion { .. } => "late_completion",
        }
    }

    pub const fn category(&self) -> Option<TaskCategory> {
        match self {
            Self::CategoryTasks { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// Rebuild criteria from persisted `(type, target, category)` columns.
    pub fn from_parts(
        criteria_type: &str,
        target: i64,
        category: Option<&str>,
    ) -> Result<Self, CoreError> {
        let criteria = match criteria_type {
            "task_count" => Self::TaskCount { target },
            "streak" => Self::Streak { target },
            "category_tasks" => {
                let category = category.ok_or_else(|| {
                    CoreError::Validation("category_tasks criteria requires a category".into())
                })?;
                Self::CategoryTasks {
                    category: category.parse()?,
                    target,
                }
            }
            "focus_time" => Self::FocusTime { target },
            "early_completion" => Self::EarlyCompletion { target },
            "late_completion" => Self::LateCompletion { target },
            other => {
                return Err(CoreError::Validation(format!(
                    "Unknown criteria type '{other}'"
                )))
            }
        };
        Ok(criteria)
    }

    /// Hour window for time-of-day criteria.
    pub const fn time_of_day(&self) -> Option<TimeOfDay> {
        match self {
            Self::EarlyCompletion { .. } => Some(TimeOfDay::Early),
            Self::LateCompletion { .. } => Some(TimeOfDay::Late),
            _ => None,
        }
    }
}

/// UTC hour window a completion has to fall in for time-of-day criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Early,
    Late,
}

impl TimeOfDay {
    /// Half-open range of UTC hours.
    pub const fn hours(self) -> Range<u32> {
        match self {
            Self::Early => 0..EARLY_HOUR_CUTOFF,
            Self::Late => LATE_HOUR_START..24,
        }
    }

    /// Whether `task` is completed and its completion hour falls in the window.
    pub fn includes(self, task: &Task) -> bool {
        task.state
            .completed_at()
            .is_some_and(|at| self.hours().contains(&at.hour()))
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementReward {
    pub xp: i64,
    pub coins: i64,
}

/// A static achievement definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub key: AchievementKey,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub rarity: Rarity,
    pub criteria: Criteria,
    pub reward: AchievementReward,
    pub is_active: bool,
}

#[allow(clippy::too_many_arguments)]
fn define(
    key: AchievementKey,
    name: &str,
    description: &str,
    category: AchievementCategory,
    rarity: Rarity,
    criteria: Criteria,
    xp: i64,
    coins: i64,
) -> AchievementDefinition {
    AchievementDefinition {
        key,
        name: name.to_string(),
        description: description.to_string(),
        category,
        rarity,
        criteria,
        reward: AchievementReward { xp, coins },
        is_active: true,
    }
}

/// The seed catalog. One definition per [`AchievementKey`].
pub fn catalog() -> Vec<AchievementDefinition> {
    use AchievementCategory as C;
    use AchievementKey as K;
    use Criteria::*;

    vec![
        define(
            K::FirstSteps,
            "First Steps",
            "Complete your first task",
            C::Milestone,
            Rarity::Common,
            TaskCount { target: 1 },
            10,
            5,
        ),
        define(
            K::RookieAchiever,
            "Rookie Achiever",
            "Complete 10 tasks",
            C::Milestone,
            Rarity::Common,
            TaskCount { target: 10 },
            50,
            10,
        ),
        define(
            K::TaskMaster,
            "Task Master",
            "Complete 50 tasks",
            C::Milestone,
            Rarity::Rare,
            TaskCount { target: 50 },
            200,
            50,
        ),
        define(
            K::Centurion,
            "Centurion",
            "Complete 100 tasks",
            C::Milestone,
            Rarity::Epic,
            TaskCount { target: 100 },
            500,
            100,
        ),
        define(
            K::StreakStarter,
            "Streak Starter",
            "Stay active 3 days in a row",
            C::Consistency,
            Rarity::Common,
            Streak { target: 3 },
            30,
            10,
        ),
        define(
            K::WeekWarrior,
            "Week Warrior",
            "Stay active 7 days in a row",
            C::Consistency,
            Rarity::Uncommon,
            Streak { target: 7 },
            100,
            25,
        ),
        define(
            K::Unstoppable,
            "Unstoppable",
            "Stay active 30 days in a row",
            C::Consistency,
            Rarity::Legendary,
            Streak { target: 30 },
            750,
            200,
        ),
        define(
            K::Workhorse,
            "Workhorse",
            "Complete 25 work tasks",
            C::Specialist,
            Rarity::Uncommon,
            CategoryTasks { category: TaskCategory::Work, target: 25 },
            150,
            30,
        ),
        define(
            K::HealthNut,
            "Health Nut",
            "Complete 25 health tasks",
            C::Specialist,
            Rarity::Uncommon,
            CategoryTasks { category: TaskCategory::Health, target: 25 },
            150,
            30,
        ),
        define(
            K::Scholar,
            "Scholar",
            "Complete 25 learning tasks",
            C::Specialist,
            Rarity::Uncommon,
            CategoryTasks { category: TaskCategory::Learning, target: 25 },
            150,
            30,
        ),
        define(
            K::EarlyBird,
            "Early Bird",
            "Complete a task before 8 AM",
            C::Timing,
            Rarity::Uncommon,
            EarlyCompletion { target: 1 },
            25,
            5,
        ),
        define(
            K::NightOwl,
            "Night Owl",
            "Complete a task after 10 PM",
            C::Timing,
            Rarity::Uncommon,
            LateCompletion { target: 1 },
            25,
            5,
        ),
        define(
            K::DeepFocus,
            "Deep Focus",
            "Log 10 hours of focus time",
            C::Focus,
            Rarity::Rare,
            FocusTime { target: 600 },
            200,
            40,
        ),
        define(
            K::FocusMarathon,
            "Focus Marathon",
            "Log 50 hours of focus time",
            C::Focus,
            Rarity::Epic,
            FocusTime { target: 3000 },
            600,
            120,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressAction {
    Set,
    Unlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub date: Timestamp,
    pub value: i64,
    pub action: ProgressAction,
}

/// Tracked progress of one user towards one achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementProgress {
    pub key: AchievementKey,
    pub progress: i64,
    pub is_unlocked: bool,
    pub unlocked_at: Option<Timestamp>,
    pub history: Vec<ProgressEntry>,
}

impl AchievementProgress {
    pub fn new(key: AchievementKey) -> Self {
        Self {
            key,
            progress: 0,
            is_unlocked: false,
            unlocked_at: None,
            history: Vec::new(),
        }
    }

    /// Fold a measured absolute value into the record. Progress never
    /// decreases and nothing changes once unlocked, so folding the same
    /// value twice is a no-op. Returns whether progress moved.
    pub fn apply(&mut self, value: i64, at: Timestamp) -> bool {
        if self.is_unlocked || value <= self.progress {
            return false;
        }
        self.progress = value;
        self.push_history(at, value, ProgressAction::Set);
        true
    }

    /// Flip to unlocked. Idempotent; the first unlock time is kept.
    pub fn mark_unlocked(&mut self, at: Timestamp) {
        if self.is_unlocked {
            return;
        }
        self.is_unlocked = true;
        self.unlocked_at = Some(at);
        let value = self.progress;
        self.push_history(at, value, ProgressAction::Unlock);
    }

    /// Progress as shown to users: never above `target`.
    pub fn reported_progress(&self, target: i64) -> i64 {
        self.progress.min(target).max(0)
    }

    fn push_history(&mut self, date: Timestamp, value: i64, action: ProgressAction) {
        self.history.push(ProgressEntry {
            date,
            value,
            action,
        });
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let overflow = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(..overflow);
        }
    }
}
