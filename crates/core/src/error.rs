//! Domain-level error taxonomy shared by every crate in the workspace.

use crate::types::DbId;

/// Errors raised by domain rules and request-level checks.
///
/// The API layer maps each variant onto an HTTP status; storage failures
/// have their own type ([`StoreError`](crate::store::StoreError)).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity does not exist (or is not visible to the caller).
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed validation (empty title, out-of-range minutes, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The entity is in a state that does not allow the requested transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Missing or invalid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
