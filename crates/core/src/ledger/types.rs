//! Ledger domain types for the account operation chain.
//!
//! An account's ledger is the append-only sequence of `OperationRecord`s
//! ordered by id. Each record carries the signed deltas it applied and the
//! running totals that resulted from them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::parse::ParseEnumError;

/// Whether an operation takes effect immediately or spans a paired lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynchronousType {
    /// Applied immediately.
    Sync,
    /// First half of an asynchronous operation (usually locks funds).
    AsyncStart,
    /// Second half of an asynchronous operation (usually releases the lock).
    AsyncEnd,
}

impl SynchronousType {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::AsyncStart => "async-start",
            Self::AsyncEnd => "async-end",
        }
    }
}

impl fmt::Display for SynchronousType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SynchronousType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(Self::Sync),
            "async-start" => Ok(Self::AsyncStart),
            "async-end" => Ok(Self::AsyncEnd),
            _ => Err(ParseEnumError::new("synchronous type", s)),
        }
    }
}

/// Business meaning of a ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// First operation of a freshly created account.
    Init,
    /// Funds received from outside the platform.
    Deposit,
    /// Funds leaving the platform.
    Withdraw,
    /// Internal transfer between accounts.
    Transfer,
    /// Fee charged for a transfer.
    TransferFee,
    /// Reversal of a failed withdraw.
    Refund,
    /// Manual correction.
    Adjustment,
    /// No business meaning attached.
    None,
    /// Anything else.
    Other,
}

impl OperationType {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::TransferFee => "transfer_fee",
            Self::Refund => "refund",
            Self::Adjustment => "adjustment",
            Self::None => "none",
            Self::Other => "other",
        }
    }

    /// Returns true for the bootstrap operation of a new account.
    #[must_use]
    pub const fn is_init(self) -> bool {
        matches!(self, Self::Init)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            "transfer" => Ok(Self::Transfer),
            "transfer_fee" => Ok(Self::TransferFee),
            "refund" => Ok(Self::Refund),
            "adjustment" => Ok(Self::Adjustment),
            "none" => Ok(Self::None),
            "other" => Ok(Self::Other),
            _ => Err(ParseEnumError::new("operation type", s)),
        }
    }
}

/// A proposed operation, before the running totals are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInput {
    /// Target account.
    pub account_id: i64,
    /// Synchronous type.
    pub synchronous_type: SynchronousType,
    /// Operation type.
    pub operation_type: OperationType,
    /// Id of the entity that originated the operation.
    pub reference_id: i64,
    /// Signed balance delta.
    pub amount: Decimal,
    /// Signed delta to locked funds.
    pub lock_amount: Decimal,
}

impl OperationInput {
    /// Builds a synchronous operation without locked-funds movement.
    #[must_use]
    pub fn sync(
        account_id: i64,
        operation_type: OperationType,
        reference_id: i64,
        amount: Decimal,
    ) -> Self {
        Self {
            account_id,
            synchronous_type: SynchronousType::Sync,
            operation_type,
            reference_id,
            amount,
            lock_amount: Decimal::ZERO,
        }
    }

    /// Builds the bootstrap operation of a new account.
    #[must_use]
    pub fn init(account_id: i64) -> Self {
        Self::sync(account_id, OperationType::Init, 0, Decimal::ZERO)
    }
}

/// A ledger row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Monotonic id; defines ordering within an account.
    pub id: i64,
    /// Account the row belongs to.
    pub account_id: i64,
    /// Synchronous type.
    pub synchronous_type: SynchronousType,
    /// Operation type.
    pub operation_type: OperationType,
    /// Originating entity id.
    pub reference_id: i64,
    /// Time of the append.
    pub timestamp: DateTime<Utc>,
    /// Signed balance delta.
    pub amount: Decimal,
    /// Running balance.
    pub balance: Decimal,
    /// Signed delta to locked funds.
    pub lock_amount: Decimal,
    /// Running locked total.
    pub total_locked: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synchronous_type_encoding() {
        for value in [
            SynchronousType::Sync,
            SynchronousType::AsyncStart,
            SynchronousType::AsyncEnd,
        ] {
            assert_eq!(value.as_str().parse::<SynchronousType>().unwrap(), value);
        }
        assert_eq!(SynchronousType::AsyncStart.to_string(), "async-start");
        assert!("async_start".parse::<SynchronousType>().is_err());
    }

    #[test]
    fn test_operation_type_encoding() {
        assert_eq!(OperationType::TransferFee.as_str(), "transfer_fee");
        assert_eq!("none".parse::<OperationType>().unwrap(), OperationType::None);
        let err = "payout".parse::<OperationType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation type value: 'payout'");
    }

    #[test]
    fn test_serde_matches_canonical_strings() {
        let json = serde_json::to_string(&SynchronousType::AsyncEnd).unwrap();
        assert_eq!(json, "\"async-end\"");
        let json = serde_json::to_string(&OperationType::TransferFee).unwrap();
        assert_eq!(json, "\"transfer_fee\"");
    }

    #[test]
    fn test_init_input_is_zero() {
        let input = OperationInput::init(7);
        assert_eq!(input.account_id, 7);
        assert!(input.operation_type.is_init());
        assert!(input.amount.is_zero());
        assert!(input.lock_amount.is_zero());
    }
}
