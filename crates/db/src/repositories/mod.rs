//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` (or a connection inside a transaction) as the
//! first argument.

pub mod achievement_repo;
pub mod task_repo;
pub mod user_repo;

pub use achievement_repo::AchievementRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
