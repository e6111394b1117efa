pub mod achievement;
pub mod focus;
pub mod leaderboard;
pub mod progress;
pub mod task;
