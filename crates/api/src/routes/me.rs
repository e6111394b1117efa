use axum::routing::get;
use axum::Router;

use crate::handlers::{achievement, progress};
use crate::state::AppState;

/// Routes mounted at `/me`, scoped to the authenticated user.
///
/// ```text
/// GET    /progress        -> get_progress
/// GET    /achievements    -> list_my_achievements
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress", get(progress::get_progress))
        .route("/achievements", get(achievement::list_my_achievements))
}
