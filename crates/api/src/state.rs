use std::sync::Arc;

use levelup_core::ProgressionEngine;
use levelup_events::EventBus;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: levelup_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Live WebSocket connections, keyed by connection id.
    pub ws_manager: Arc<WsManager>,
    /// Fan-out bus the engine publishes progression events to.
    pub event_bus: Arc<EventBus>,
    /// Task and focus-session completion use cases.
    pub engine: Arc<ProgressionEngine>,
}
