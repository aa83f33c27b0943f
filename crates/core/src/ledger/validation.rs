//! Invariant checks for ledger rows.
//!
//! The same checks run twice during an append: once on the computed row
//! before an id is allocated (with `UNALLOCATED_OPERATION_ID` standing in),
//! and once on the row the store returned after the insert.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{OperationInput, OperationRecord};

/// Placeholder id used for the pre-insert check.
pub const UNALLOCATED_OPERATION_ID: i64 = i64::MAX;

/// Validates a proposed operation before anything is read from the store.
///
/// # Errors
///
/// Returns an error for a zero account id, or for an operation that moves
/// neither balance nor locked funds (allowed only for `init`).
pub fn validate_input(input: &OperationInput) -> Result<(), LedgerError> {
    if input.account_id <= 0 {
        return Err(LedgerError::InvalidAccountId);
    }
    if !input.operation_type.is_init() && input.amount.is_zero() && input.lock_amount.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }
    Ok(())
}

/// Validates the numeric invariants of a ledger row.
///
/// # Errors
///
/// Returns the first violated invariant.
pub fn validate_record(record: &OperationRecord) -> Result<(), LedgerError> {
    if record.id <= 0 {
        return Err(LedgerError::InvalidOperationId);
    }
    if record.account_id <= 0 {
        return Err(LedgerError::InvalidAccountId);
    }
    if !record.operation_type.is_init() && record.amount.is_zero() && record.lock_amount.is_zero()
    {
        return Err(LedgerError::ZeroAmount);
    }
    if record.balance < Decimal::ZERO {
        return Err(LedgerError::NegativeBalance {
            balance: record.balance,
        });
    }
    if record.total_locked < Decimal::ZERO {
        return Err(LedgerError::NegativeTotalLocked {
            total_locked: record.total_locked,
        });
    }
    if record.total_locked > record.balance {
        return Err(LedgerError::LockedExceedsBalance {
            total_locked: record.total_locked,
            balance: record.balance,
        });
    }
    if record.amount > record.balance {
        return Err(LedgerError::AmountExceedsBalance {
            amount: record.amount,
            balance: record.balance,
        });
    }
    if record.lock_amount > record.total_locked {
        return Err(LedgerError::LockAmountExceedsTotalLocked {
            lock_amount: record.lock_amount,
            total_locked: record.total_locked,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{OperationType, SynchronousType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(amount: Decimal, balance: Decimal, lock: Decimal, locked: Decimal) -> OperationRecord {
        OperationRecord {
            id: 1,
            account_id: 1,
            synchronous_type: SynchronousType::Sync,
            operation_type: OperationType::Deposit,
            reference_id: 0,
            timestamp: Utc::now(),
            amount,
            balance,
            lock_amount: lock,
            total_locked: locked,
        }
    }

    #[test]
    fn test_valid_record() {
        assert!(validate_record(&record(dec!(1), dec!(1), dec!(0), dec!(0))).is_ok());
        assert!(validate_record(&record(dec!(-1), dec!(2), dec!(1), dec!(1))).is_ok());
    }

    #[test]
    fn test_zero_account_rejected() {
        let input = OperationInput::sync(0, OperationType::Deposit, 1, dec!(1));
        assert!(matches!(
            validate_input(&input),
            Err(LedgerError::InvalidAccountId)
        ));
    }

    #[test]
    fn test_zero_movement_rejected_unless_init() {
        let input = OperationInput::sync(1, OperationType::Deposit, 1, Decimal::ZERO);
        assert!(matches!(validate_input(&input), Err(LedgerError::ZeroAmount)));
        assert!(validate_input(&OperationInput::init(1)).is_ok());

        let mut init = record(dec!(0), dec!(0), dec!(0), dec!(0));
        init.operation_type = OperationType::Init;
        assert!(validate_record(&init).is_ok());
    }

    #[test]
    fn test_lock_only_movement_accepted() {
        let mut input = OperationInput::sync(1, OperationType::Withdraw, 1, Decimal::ZERO);
        input.lock_amount = dec!(0.5);
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn test_negative_balance_rejected() {
        assert!(matches!(
            validate_record(&record(dec!(-2), dec!(-1), dec!(0), dec!(0))),
            Err(LedgerError::NegativeBalance { .. })
        ));
    }

    #[test]
    fn test_negative_locked_rejected() {
        assert!(matches!(
            validate_record(&record(dec!(1), dec!(1), dec!(-1), dec!(-1))),
            Err(LedgerError::NegativeTotalLocked { .. })
        ));
    }

    #[test]
    fn test_locked_above_balance_rejected() {
        assert!(matches!(
            validate_record(&record(dec!(1), dec!(1), dec!(2), dec!(2))),
            Err(LedgerError::LockedExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_placeholder_id_is_valid() {
        let mut r = record(dec!(1), dec!(1), dec!(0), dec!(0));
        r.id = UNALLOCATED_OPERATION_ID;
        assert!(validate_record(&r).is_ok());
        r.id = 0;
        assert!(matches!(
            validate_record(&r),
            Err(LedgerError::InvalidOperationId)
        ));
    }
}
