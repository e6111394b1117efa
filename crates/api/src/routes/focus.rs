use axum::routing::post;
use axum::Router;

use crate::handlers::focus;
use crate::state::AppState;

/// Routes mounted at `/focus-sessions`.
///
/// ```text
/// POST   /    -> complete_focus_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(focus::complete_focus_session))
}
