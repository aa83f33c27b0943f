//! Withdraw statuses and batch modes.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::parse::ParseEnumError;

/// Status of a withdraw. The current status is the latest history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawStatus {
    /// Requested, waiting for a batch.
    Created,
    /// Attached to a batch and submitted.
    Processing,
    /// Confirmed by the destination network.
    Settled,
    /// Cancellation requested.
    Canceling,
    /// Canceled.
    Canceled,
}

impl WithdrawStatus {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Settled => "settled",
            Self::Canceling => "canceling",
            Self::Canceled => "canceled",
        }
    }

    /// Returns true if the status may change to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Created,
                Self::Processing | Self::Canceling | Self::Canceled
            ) | (Self::Processing, Self::Settled | Self::Canceling)
                | (Self::Canceling, Self::Canceled)
        )
    }

    /// Returns true once no further transition is possible.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Settled | Self::Canceled)
    }
}

impl fmt::Display for WithdrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "processing" => Ok(Self::Processing),
            "settled" => Ok(Self::Settled),
            "canceling" => Ok(Self::Canceling),
            "canceled" => Ok(Self::Canceled),
            _ => Err(ParseEnumError::new("withdraw status", s)),
        }
    }
}

/// Urgency requested for a withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Submit alone, as soon as possible.
    Instant,
    /// Next batch.
    Fast,
    /// Regular batching.
    #[default]
    Normal,
    /// Lowest fee, may wait several batches.
    Slow,
}

impl BatchMode {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instant => "instant",
            Self::Fast => "fast",
            Self::Normal => "normal",
            Self::Slow => "slow",
        }
    }
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instant" => Ok(Self::Instant),
            "fast" => Ok(Self::Fast),
            "normal" => Ok(Self::Normal),
            "slow" => Ok(Self::Slow),
            _ => Err(ParseEnumError::new("batch mode", s)),
        }
    }
}

/// Returns true if a withdraw with this status history has never advanced.
///
/// Anything other than a single `created` row means another pass already
/// touched the withdraw, so it must not be processed again.
#[must_use]
pub fn is_unprocessed(history: &[WithdrawStatus]) -> bool {
    matches!(history, [WithdrawStatus::Created])
}

/// Why a single withdraw was refused during batch assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Destination public key is empty.
    EmptyPublicKey,
    /// Amount is zero or negative.
    NonPositiveAmount,
}

impl RejectReason {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyPublicKey => "empty_public_key",
            Self::NonPositiveAmount => "non_positive_amount",
        }
    }
}

/// Checks one on-chain withdraw before it may join a batch.
///
/// # Errors
///
/// Returns the reason the item must be canceled.
pub fn check_onchain_item(public_key: &str, amount: Decimal) -> Result<(), RejectReason> {
    if public_key.trim().is_empty() {
        return Err(RejectReason::EmptyPublicKey);
    }
    if amount <= Decimal::ZERO {
        return Err(RejectReason::NonPositiveAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_withdraw_transitions() {
        assert!(WithdrawStatus::Created.can_transition_to(WithdrawStatus::Processing));
        assert!(WithdrawStatus::Created.can_transition_to(WithdrawStatus::Canceled));
        assert!(WithdrawStatus::Processing.can_transition_to(WithdrawStatus::Settled));
        assert!(WithdrawStatus::Canceling.can_transition_to(WithdrawStatus::Canceled));
        assert!(!WithdrawStatus::Processing.can_transition_to(WithdrawStatus::Canceled));
        assert!(!WithdrawStatus::Settled.can_transition_to(WithdrawStatus::Canceling));
        assert!(!WithdrawStatus::Canceled.can_transition_to(WithdrawStatus::Created));
    }

    #[test]
    fn test_is_unprocessed() {
        assert!(is_unprocessed(&[WithdrawStatus::Created]));
        assert!(!is_unprocessed(&[]));
        assert!(!is_unprocessed(&[WithdrawStatus::Processing]));
        assert!(!is_unprocessed(&[
            WithdrawStatus::Created,
            WithdrawStatus::Processing
        ]));
    }

    #[test]
    fn test_check_onchain_item() {
        assert!(check_onchain_item("bc1qxyz", dec!(0.1)).is_ok());
        assert_eq!(
            check_onchain_item("", dec!(0.1)),
            Err(RejectReason::EmptyPublicKey)
        );
        assert_eq!(
            check_onchain_item("bc1qxyz", Decimal::ZERO),
            Err(RejectReason::NonPositiveAmount)
        );
        assert_eq!(
            check_onchain_item("bc1qxyz", dec!(-1)),
            Err(RejectReason::NonPositiveAmount)
        );
    }

    #[test]
    fn test_batch_mode_encoding() {
        assert_eq!(BatchMode::default(), BatchMode::Normal);
        assert_eq!("slow".parse::<BatchMode>().unwrap(), BatchMode::Slow);
        assert!("urgent".parse::<BatchMode>().is_err());
    }
}
