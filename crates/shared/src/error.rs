//! Application-wide error types.
//!
//! Every module-level error in the workspace classifies itself into one
//! `ErrorKind`. The kind decides propagation: validation and not-found
//! errors return before any side effect, state conflicts abort the enclosing
//! database transaction, concurrency errors abort before any mutation starts,
//! and external errors roll back the work that depended on the call.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Error taxonomy shared by all crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Zero or invalid ids, non-positive amounts, unknown enum values.
    Validation,
    /// Missing account, currency, withdraw or batch.
    NotFound,
    /// Currency unavailable, account not normal, ledger invariant failure.
    StateConflict,
    /// Lock acquisition exhausted its retries or the lock was lost.
    Concurrency,
    /// Settlement submission failed.
    External,
    /// Storage or other unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Concurrency | Self::External)
    }
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// State conflict (unavailable currency, account status, invariant).
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Concurrency error (lock not acquired or lost).
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds an error of the given kind.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::StateConflict => Self::StateConflict(message),
            ErrorKind::Concurrency => Self::Concurrency(message),
            ErrorKind::External => Self::ExternalService(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::Concurrency(_) => ErrorKind::Concurrency,
            Self::ExternalService(_) => ErrorKind::External,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for message responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::StateConflict(_) => "STATE_CONFLICT",
            Self::Concurrency(_) => "CONCURRENCY_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
