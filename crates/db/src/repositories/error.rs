//! Repository error type.

use custody_core::account::AccountRuleError;
use custody_core::batch::BatchError;
use custody_core::ledger::LedgerError;
use custody_core::withdraw::WithdrawError;
use custody_shared::{AppError, ErrorKind};
use sea_orm::DbErr;

/// Errors returned by repositories.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Account identity or status rule violated.
    #[error(transparent)]
    Account(#[from] AccountRuleError),

    /// Ledger validation, lookup or invariant failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Withdraw validation, lookup or transition failure.
    #[error(transparent)]
    Withdraw(#[from] WithdrawError),

    /// Batch validation, lookup or transition failure.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// A payload could not be encoded for storage.
    #[error("Encoding error: {0}")]
    Encode(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl StoreError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Account(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Withdraw(e) => e.kind(),
            Self::Batch(e) => e.kind(),
            Self::Encode(_) | Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Returns the ledger error, if this is one.
    #[must_use]
    pub const fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => Self::Database(e.to_string()),
            other => Self::from_kind(other.kind(), other.to_string()),
        }
    }
}
