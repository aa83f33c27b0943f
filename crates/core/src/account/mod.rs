//! Account status gate.
//!
//! An account's status is kept outside the ledger and decides whether new
//! operations may be appended to it.

use std::fmt;
use std::str::FromStr;

use custody_shared::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{LedgerError, OperationType};
use crate::parse::ParseEnumError;

/// Current status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Created, not yet activated.
    Created,
    /// Accepts operations.
    Normal,
    /// Temporarily frozen.
    Locked,
    /// Permanently closed to new operations.
    Disabled,
}

impl AccountStatus {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Normal => "normal",
            Self::Locked => "locked",
            Self::Disabled => "disabled",
        }
    }

    /// Checks that an operation of `operation_type` may be appended.
    ///
    /// `init` bootstraps a brand-new account and is exempt from the gate.
    ///
    /// # Errors
    ///
    /// Returns the ledger error matching the blocking status.
    pub fn ensure_accepts(self, account_id: i64, operation_type: OperationType) -> Result<(), LedgerError> {
        if operation_type.is_init() {
            return Ok(());
        }
        match self {
            Self::Normal => Ok(()),
            Self::Created => Err(LedgerError::AccountNotActivated(account_id)),
            Self::Locked => Err(LedgerError::AccountIsLocked(account_id)),
            Self::Disabled => Err(LedgerError::AccountIsDisabled(account_id)),
        }
    }

    /// Returns true if the status may change to `next`.
    ///
    /// `created` is only ever the first status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        !matches!(next, Self::Created) || matches!(self, Self::Created)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "normal" => Ok(Self::Normal),
            "locked" => Ok(Self::Locked),
            "disabled" => Ok(Self::Disabled),
            _ => Err(ParseEnumError::new("account status", s)),
        }
    }
}

/// Validation errors for account creation and status changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountRuleError {
    /// User id is zero or negative.
    #[error("Invalid user id")]
    InvalidUserId,

    /// Account name is empty.
    #[error("Account name cannot be empty")]
    EmptyName,

    /// Status change not allowed.
    #[error("Cannot change account status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: AccountStatus,
        /// Requested status.
        to: AccountStatus,
    },
}

impl AccountRuleError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Validates the identity of a new account.
///
/// # Errors
///
/// Returns an error for a zero user id or a blank name.
pub fn validate_new_account(user_id: i64, name: &str) -> Result<(), AccountRuleError> {
    if user_id <= 0 {
        return Err(AccountRuleError::InvalidUserId);
    }
    if name.trim().is_empty() {
        return Err(AccountRuleError::EmptyName);
    }
    Ok(())
}
