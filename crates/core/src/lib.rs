//! LevelUp domain logic.
//!
//! Pure reward, streak, level and achievement rules plus the orchestrator
//! that applies them when a user completes a task or a focus session:
//!
//! - [`rewards`], [`streak`], [`leveling`]: deterministic rule functions.
//! - [`achievements`]: typed achievement registry and progress tracking.
//! - [`store::ProgressionStore`]: persistence seam (PostgreSQL lives in
//!   `levelup-db`, an in-process implementation in [`memory`]).
//! - [`events::EventPublisher`]: injected fan-out capability.
//! - [`engine::ProgressionEngine`]: the completion use cases.

pub mod achievements;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod leveling;
pub mod memory;
pub mod progress;
pub mod rewards;
pub mod store;
pub mod streak;
pub mod task;
pub mod types;

pub use engine::{CompletionOutcome, FocusOutcome, ProgressionEngine, ProgressionError};
pub use error::CoreError;
pub use events::{EventPublisher, ProgressionEvent, Topic};
pub use store::{ProgressionStore, StoreError};
