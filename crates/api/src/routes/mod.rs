pub mod achievements;
pub mod focus;
pub mod health;
pub mod leaderboard;
pub mod me;
pub mod tasks;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket (token in query)
///
/// /tasks                       list, create
/// /tasks/{id}                  get, update
/// /tasks/{id}/start            start (POST)
/// /tasks/{id}/complete         complete (POST)
///
/// /focus-sessions              record a focus session (POST)
///
/// /me/progress                 xp, coins, level progress, streak, stats
/// /me/achievements             achievement progress
///
/// /achievements                active catalog
/// /leaderboard                 top users by xp
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/tasks", tasks::router())
        .nest("/focus-sessions", focus::router())
        .nest("/me", me::router())
        .nest("/achievements", achievements::router())
        .nest("/leaderboard", leaderboard::router())
}
