// src/common/error.rs

use thiserror::Error;

// Our error type, with `thiserror` for better ergonomics. The boundary layer
// maps these to caller-visible failures; `Forbidden` and `NotFound` carry
// different security semantics and must never be collapsed into each other.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    // Authenticated, but the account has not been approved yet. Distinct
    // from an authorization failure.
    #[error("account is awaiting approval")]
    Unapproved,

    // Authenticated and approved, but lacking the exact permission.
    #[error("missing permission '{0}'")]
    Forbidden(String),

    // A state-transition precondition was violated (completing a non-pending
    // record, deleting a completed one, duplicate unique key).
    #[error("{0}")]
    Conflict(String),

    // Database variant (sqlx); always rolls back the enclosing transaction.
    #[error("database error")]
    Database(sqlx::Error),

    // Catch-all for anything unexpected. `anyhow::Error` keeps the context.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

// Unique-key and foreign-key violations are caller mistakes (duplicate name,
// dangling reference), so they surface as `Conflict` rather than a server
// failure.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if matches!(db_err.code().as_deref(), Some("23505") | Some("23503")) {
                return AppError::Conflict(db_err.message().to_string());
            }
        }
        AppError::Database(err)
    }
}

impl AppError {
    /// True for errors caused by the caller rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::Unapproved
                | AppError::Forbidden(_)
                | AppError::Conflict(_)
        )
    }
}
