//! Lock error types.

use custody_shared::ErrorKind;
use thiserror::Error;

/// Errors that can occur while acquiring or holding a lock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Every acquisition attempt found the lock held.
    #[error("Could not acquire lock '{key}' after {attempts} attempts")]
    Exhausted {
        /// Lock key.
        key: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The lock expired or was taken over while still in use.
    #[error("Lock '{0}' is no longer held")]
    Lost(String),

    /// The key cannot be used.
    #[error("Invalid lock key: {0}")]
    InvalidKey(String),

    /// Lock service failure.
    #[error("Lock backend error: {0}")]
    Backend(String),
}

impl LockError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Exhausted { .. } | Self::Lost(_) => ErrorKind::Concurrency,
            Self::InvalidKey(_) => ErrorKind::Validation,
            Self::Backend(_) => ErrorKind::Internal,
        }
    }
}
