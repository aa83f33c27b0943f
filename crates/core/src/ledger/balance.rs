//! Running-total arithmetic for the operation chain.
//!
//! The "previous operation" of an account is whatever the store reports as
//! its latest row; the totals of a new row are that row's totals plus the
//! new deltas, rounded to `AMOUNT_SCALE` places.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{OperationInput, OperationRecord};
use super::validation::validate_record;

/// Number of decimal places kept for every monetary value.
pub const AMOUNT_SCALE: u32 = 12;

/// Rounds a monetary value to the ledger precision.
#[must_use]
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Running totals of an account after its latest operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainState {
    /// Running balance.
    pub balance: Decimal,
    /// Running locked total.
    pub total_locked: Decimal,
}

impl ChainState {
    /// State of an account with no operations.
    pub const EMPTY: Self = Self {
        balance: Decimal::ZERO,
        total_locked: Decimal::ZERO,
    };

    /// State after `previous`, or the empty state when there is none.
    #[must_use]
    pub fn after(previous: Option<&OperationRecord>) -> Self {
        previous.map_or(Self::EMPTY, |op| Self {
            balance: op.balance,
            total_locked: op.total_locked,
        })
    }

    /// Funds that are not locked.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.balance - self.total_locked
    }

    /// Applies signed deltas and rounds the result.
    #[must_use]
    pub fn apply(&self, amount: Decimal, lock_amount: Decimal) -> Self {
        Self {
            balance: round_amount(amount + self.balance),
            total_locked: round_amount(lock_amount + self.total_locked),
        }
    }
}

/// Computes the next row of the chain for `input`.
///
/// The returned record carries the given `id`; pass a placeholder when the
/// real id has not been allocated yet.
#[must_use]
pub fn next_record(
    previous: Option<&OperationRecord>,
    input: &OperationInput,
    id: i64,
    timestamp: DateTime<Utc>,
) -> OperationRecord {
    let amount = round_amount(input.amount);
    let lock_amount = round_amount(input.lock_amount);
    let state = ChainState::after(previous).apply(amount, lock_amount);

    OperationRecord {
        id,
        account_id: input.account_id,
        synchronous_type: input.synchronous_type,
        operation_type: input.operation_type,
        reference_id: input.reference_id,
        timestamp,
        amount,
        balance: state.balance,
        lock_amount,
        total_locked: state.total_locked,
    }
}

/// Verifies a full account history, ordered by id.
///
/// Checks every row's own invariants, strictly increasing ids, and that each
/// running total equals the previous total plus the row's delta.
///
/// # Errors
///
/// Returns the first violation found.
pub fn verify_chain(history: &[OperationRecord]) -> Result<ChainState, LedgerError> {
    let mut state = ChainState::EMPTY;
    let mut last_id = 0;

    for op in history {
        validate_record(op)?;
        if op.id <= last_id {
            return Err(LedgerError::ChainBroken { operation_id: op.id });
        }

        let expected = state.apply(op.amount, op.lock_amount);
        if expected.balance != op.balance || expected.total_locked != op.total_locked {
            return Err(LedgerError::ChainBroken { operation_id: op.id });
        }

        state = expected;
        last_id = op.id;
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{OperationType, SynchronousType};
    use rust_decimal_macros::dec;

    fn deposit(account_id: i64, amount: Decimal) -> OperationInput {
        OperationInput::sync(account_id, OperationType::Deposit, 1, amount)
    }

    #[test]
    fn test_first_record_starts_from_zero() {
        let record = next_record(None, &deposit(1, dec!(1.0)), 10, Utc::now());
        assert_eq!(record.balance, dec!(1.0));
        assert_eq!(record.total_locked, Decimal::ZERO);
        assert_eq!(record.id, 10);
    }

    #[test]
    fn test_record_chains_on_previous() {
        let first = next_record(None, &deposit(1, dec!(1.0)), 1, Utc::now());
        let second = next_record(Some(&first), &deposit(1, dec!(-0.5)), 2, Utc::now());
        assert_eq!(second.balance, dec!(0.5));
    }

    #[test]
    fn test_lock_amount_accumulates() {
        let first = next_record(None, &deposit(1, dec!(3)), 1, Utc::now());
        let lock = OperationInput {
            account_id: 1,
            synchronous_type: SynchronousType::AsyncStart,
            operation_type: OperationType::Withdraw,
            reference_id: 9,
            amount: Decimal::ZERO,
            lock_amount: dec!(2),
        };
        let second = next_record(Some(&first), &lock, 2, Utc::now());
        assert_eq!(second.balance, dec!(3));
        assert_eq!(second.total_locked, dec!(2));
        assert_eq!(ChainState::after(Some(&second)).available(), dec!(1));
    }

    #[test]
    fn test_amounts_are_rounded() {
        let record = next_record(
            None,
            &deposit(1, dec!(0.1234567890125)),
            1,
            Utc::now(),
        );
        assert_eq!(record.amount, dec!(0.123456789013));
        assert_eq!(record.balance, dec!(0.123456789013));
    }

    #[test]
    fn test_verify_chain_accepts_consistent_history() {
        let a = next_record(None, &OperationInput::init(1), 1, Utc::now());
        let b = next_record(Some(&a), &deposit(1, dec!(2)), 2, Utc::now());
        let c = next_record(Some(&b), &deposit(1, dec!(-1.5)), 5, Utc::now());
        let state = verify_chain(&[a, b, c]).unwrap();
        assert_eq!(state.balance, dec!(0.5));
    }

    #[test]
    fn test_verify_chain_rejects_tampered_total() {
        let a = next_record(None, &deposit(1, dec!(2)), 1, Utc::now());
        let mut b = next_record(Some(&a), &deposit(1, dec!(1)), 2, Utc::now());
        b.balance = dec!(4);
        assert!(matches!(
            verify_chain(&[a, b]),
            Err(LedgerError::ChainBroken { operation_id: 2 })
        ));
    }

    #[test]
    fn test_verify_chain_rejects_unordered_ids() {
        let a = next_record(None, &deposit(1, dec!(2)), 3, Utc::now());
        let b = next_record(Some(&a), &deposit(1, dec!(1)), 2, Utc::now());
        assert!(matches!(
            verify_chain(&[a, b]),
            Err(LedgerError::ChainBroken { operation_id: 2 })
        ));
    }
}
