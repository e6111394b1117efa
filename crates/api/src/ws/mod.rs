//! WebSocket transport for real-time progression events.
//!
//! Connections are authenticated at upgrade time and registered with the
//! [`WsManager`] under their user id; the
//! [`FanoutRouter`](crate::notifications::FanoutRouter) pushes events
//! through it.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
