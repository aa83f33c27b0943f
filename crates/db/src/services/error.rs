//! Service error type.

use custody_core::account::AccountRuleError;
use custody_core::batch::BatchError;
use custody_core::ledger::LedgerError;
use custody_core::settlement::GatewayError;
use custody_core::withdraw::WithdrawError;
use custody_lock::LockError;
use custody_shared::{AppError, ErrorKind};
use sea_orm::DbErr;

use crate::repositories::StoreError;

/// Errors returned by the locked services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Repository failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Lock could not be acquired or was lost.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Wallet gateway refused or failed the submission.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ServiceError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::Lock(e) => e.kind(),
            Self::Gateway(e) => e.kind(),
        }
    }

    /// Returns the error code for message responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Store(StoreError::Ledger(e)) => e.error_code(),
            Self::Store(StoreError::Withdraw(e)) => e.error_code(),
            Self::Store(StoreError::Database(_) | StoreError::Encode(_)) => "INTERNAL_ERROR",
            Self::Store(StoreError::Account(_) | StoreError::Batch(_)) => match self.kind() {
                ErrorKind::NotFound => "NOT_FOUND",
                ErrorKind::StateConflict => "STATE_CONFLICT",
                ErrorKind::Internal => "INTERNAL_ERROR",
                _ => "VALIDATION_ERROR",
            },
            Self::Lock(_) => "CONCURRENCY_ERROR",
            Self::Gateway(_) => "EXTERNAL_SERVICE_ERROR",
        }
    }

    /// Returns the ledger error, if this is one.
    #[must_use]
    pub const fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Store(e) => e.as_ledger(),
            _ => None,
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        Self::Store(err.into())
    }
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        Self::Store(err.into())
    }
}

impl From<AccountRuleError> for ServiceError {
    fn from(err: AccountRuleError) -> Self {
        Self::Store(err.into())
    }
}

impl From<WithdrawError> for ServiceError {
    fn from(err: WithdrawError) -> Self {
        Self::Store(err.into())
    }
}

impl From<BatchError> for ServiceError {
    fn from(err: BatchError) -> Self {
        Self::Store(err.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => e.into(),
            other => Self::from_kind(other.kind(), other.to_string()),
        }
    }
}
