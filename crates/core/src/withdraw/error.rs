//! Withdraw error types.

use custody_shared::ErrorKind;
use thiserror::Error;

use super::target::WithdrawTargetType;
use super::types::WithdrawStatus;

/// Errors that can occur while creating or advancing withdraws.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawError {
    /// Withdraw id is zero or negative.
    #[error("Invalid withdraw id")]
    InvalidWithdrawId,

    /// Source or destination account id is zero or negative.
    #[error("Invalid account id")]
    InvalidAccountId,

    /// Amount is zero or negative.
    #[error("Withdraw amount must be positive")]
    NonPositiveAmount,

    /// Target tag is not a known destination type.
    #[error("Unknown withdraw target type: '{0}'")]
    UnknownTargetType(String),

    /// No processing exists for this destination type.
    #[error("Processing withdraw type {0} is not supported")]
    UnsupportedTargetType(WithdrawTargetType),

    /// Target payload does not match its tag.
    #[error("Cannot decode {target_type} target: {reason}")]
    PayloadDecode {
        /// Tag of the payload.
        target_type: WithdrawTargetType,
        /// Decoder message.
        reason: String,
    },

    /// Withdraw not found.
    #[error("Withdraw not found: {0}")]
    NotFound(i64),

    /// Withdraw has no status history.
    #[error("Withdraw {0} has no status history")]
    EmptyHistory(i64),

    /// Status change not allowed.
    #[error("Cannot change withdraw status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: WithdrawStatus,
        /// Requested status.
        to: WithdrawStatus,
    },
}

impl WithdrawError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidWithdrawId
            | Self::InvalidAccountId
            | Self::NonPositiveAmount
            | Self::UnknownTargetType(_)
            | Self::UnsupportedTargetType(_)
            | Self::PayloadDecode { .. } => ErrorKind::Validation,
            Self::NotFound(_) | Self::EmptyHistory(_) => ErrorKind::NotFound,
            Self::InvalidStatusTransition { .. } => ErrorKind::StateConflict,
        }
    }

    /// Returns the error code for message responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidWithdrawId => "INVALID_WITHDRAW_ID",
            Self::InvalidAccountId => "INVALID_ACCOUNT_ID",
            Self::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            Self::UnknownTargetType(_) => "UNKNOWN_TARGET_TYPE",
            Self::UnsupportedTargetType(_) => "PROCESSING_WITHDRAW_TYPE",
            Self::PayloadDecode { .. } => "TARGET_DECODE_FAILED",
            Self::NotFound(_) => "WITHDRAW_NOT_FOUND",
            Self::EmptyHistory(_) => "WITHDRAW_HISTORY_EMPTY",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
        }
    }
}

/// Checks a status change against the withdraw state machine.
///
/// # Errors
///
/// Returns `InvalidStatusTransition` if the change is not allowed.
pub fn ensure_transition(from: WithdrawStatus, to: WithdrawStatus) -> Result<(), WithdrawError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(WithdrawError::InvalidStatusTransition { from, to })
    }
}
