//! Ledger error types for validation and state errors.

use custody_shared::ErrorKind;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Account id is zero or negative.
    #[error("Invalid account id")]
    InvalidAccountId,

    /// Operation id is zero or negative.
    #[error("Invalid operation id")]
    InvalidOperationId,

    /// Operation moves neither balance nor locked funds.
    #[error("Operation amount and lock amount cannot both be zero")]
    ZeroAmount,

    /// Transfer amount must be positive.
    #[error("Transfer amount must be positive")]
    NonPositiveTransfer,

    /// Source and destination of a transfer are the same account.
    #[error("Cannot transfer to the same account {0}")]
    SameAccountTransfer(i64),

    // ========== Not Found Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// Currency not found.
    #[error("Currency '{0}' not found")]
    CurrencyNotFound(String),

    /// Account has no state row.
    #[error("Account {0} has no state")]
    AccountStateNotFound(i64),

    // ========== State Errors ==========
    /// Currency is not available.
    #[error("Currency '{0}' is not available")]
    CurrencyNotAvailable(String),

    /// Account has not been activated yet.
    #[error("Account {0} is not activated")]
    AccountNotActivated(i64),

    /// Account is locked.
    #[error("Account {0} is locked")]
    AccountIsLocked(i64),

    /// Account is disabled.
    #[error("Account {0} is disabled")]
    AccountIsDisabled(i64),

    /// Transfer between accounts of different currencies.
    #[error("Currency mismatch: {source_currency} to {destination_currency}")]
    CurrencyMismatch {
        /// Currency of the source account.
        source_currency: String,
        /// Currency of the destination account.
        destination_currency: String,
    },

    // ========== Invariant Errors ==========
    /// Running balance would become negative.
    #[error("Balance cannot be negative: {balance}")]
    NegativeBalance {
        /// The offending balance.
        balance: Decimal,
    },

    /// Running locked total would become negative.
    #[error("Total locked cannot be negative: {total_locked}")]
    NegativeTotalLocked {
        /// The offending locked total.
        total_locked: Decimal,
    },

    /// Locked funds exceed the balance.
    #[error("Total locked {total_locked} exceeds balance {balance}")]
    LockedExceedsBalance {
        /// Running locked total.
        total_locked: Decimal,
        /// Running balance.
        balance: Decimal,
    },

    /// Operation amount exceeds the resulting balance.
    #[error("Amount {amount} exceeds balance {balance}")]
    AmountExceedsBalance {
        /// Operation amount.
        amount: Decimal,
        /// Running balance.
        balance: Decimal,
    },

    /// Lock delta exceeds the resulting locked total.
    #[error("Lock amount {lock_amount} exceeds total locked {total_locked}")]
    LockAmountExceedsTotalLocked {
        /// Operation lock amount.
        lock_amount: Decimal,
        /// Running locked total.
        total_locked: Decimal,
    },

    /// Stored history does not chain.
    #[error("Operation chain broken at operation {operation_id}")]
    ChainBroken {
        /// First row that does not follow from its predecessor.
        operation_id: i64,
    },
}

impl LedgerError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAccountId
            | Self::InvalidOperationId
            | Self::ZeroAmount
            | Self::NonPositiveTransfer
            | Self::SameAccountTransfer(_) => ErrorKind::Validation,

            Self::AccountNotFound(_)
            | Self::CurrencyNotFound(_)
            | Self::AccountStateNotFound(_) => ErrorKind::NotFound,

            Self::CurrencyNotAvailable(_)
            | Self::AccountNotActivated(_)
            | Self::AccountIsLocked(_)
            | Self::AccountIsDisabled(_)
            | Self::CurrencyMismatch { .. }
            | Self::NegativeBalance { .. }
            | Self::NegativeTotalLocked { .. }
            | Self::LockedExceedsBalance { .. }
            | Self::AmountExceedsBalance { .. }
            | Self::LockAmountExceedsTotalLocked { .. }
            | Self::ChainBroken { .. } => ErrorKind::StateConflict,
        }
    }

    /// Returns the error code for message responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAccountId => "INVALID_ACCOUNT_ID",
            Self::InvalidOperationId => "INVALID_OPERATION_ID",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NonPositiveTransfer => "NON_POSITIVE_TRANSFER",
            Self::SameAccountTransfer(_) => "SAME_ACCOUNT_TRANSFER",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            Self::AccountStateNotFound(_) => "ACCOUNT_STATE_NOT_FOUND",
            Self::CurrencyNotAvailable(_) => "CURRENCY_NOT_AVAILABLE",
            Self::AccountNotActivated(_) => "ACCOUNT_NOT_ACTIVATED",
            Self::AccountIsLocked(_) => "ACCOUNT_IS_LOCKED",
            Self::AccountIsDisabled(_) => "ACCOUNT_IS_DISABLED",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::NegativeBalance { .. } => "NEGATIVE_BALANCE",
            Self::NegativeTotalLocked { .. } => "NEGATIVE_TOTAL_LOCKED",
            Self::LockedExceedsBalance { .. } => "LOCKED_EXCEEDS_BALANCE",
            Self::AmountExceedsBalance { .. } => "AMOUNT_EXCEEDS_BALANCE",
            Self::LockAmountExceedsTotalLocked { .. } => "LOCK_AMOUNT_EXCEEDS_TOTAL_LOCKED",
            Self::ChainBroken { .. } => "CHAIN_BROKEN",
        }
    }
}
