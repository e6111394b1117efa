use axum::routing::get;
use axum::Router;

use crate::handlers::achievement;
use crate::state::AppState;

/// Routes mounted at `/achievements`.
///
/// ```text
/// GET    /    -> list_achievements
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(achievement::list_achievements))
}
