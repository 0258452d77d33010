use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrigadeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A concurrent dispatch won the unit. Recoverable: retry against a
    /// refreshed candidate pool.
    #[error("Assignment conflict: unit no longer eligible")]
    AssignmentConflict,

    /// The routing provider failed, timed out, or returned empty geometry.
    /// Recoverable: the unit keeps moving without a route until repair.
    #[error("Route unavailable")]
    RouteUnavailable,

    #[error("Illegal unit status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
