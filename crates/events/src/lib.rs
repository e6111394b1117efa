//! LevelUp real-time event bus.
//!
//! [`EventBus`] is the in-process publish/subscribe hub the progression
//! engine publishes into (it implements
//! [`EventPublisher`](levelup_core::events::EventPublisher)). Subscribers
//! such as the WebSocket fan-out router receive every [`FanoutEvent`] and
//! route it by [`Topic`](levelup_core::events::Topic).

pub mod bus;

pub use bus::{EventBus, FanoutEvent};
