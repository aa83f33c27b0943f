//! Property-based tests for the operation chain.
//!
//! - Accepted rows always chain: balance[n] = balance[n-1] + amount[n]
//! - Rejected rows never change the running totals
//! - No accepted row ever has a negative balance or locks more than it holds

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{ChainState, next_record, round_amount, verify_chain};
use super::types::{OperationInput, OperationRecord, OperationType, SynchronousType};
use super::validation::{UNALLOCATED_OPERATION_ID, validate_record};

/// Strategy to generate signed amounts (-100.00 to 100.00).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    (-10_000i64..10_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate small signed lock deltas (-10.00 to 10.00).
fn signed_lock() -> impl Strategy<Value = Decimal> {
    (-1_000i64..1_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn make_input(amount: Decimal, lock_amount: Decimal) -> OperationInput {
    OperationInput {
        account_id: 1,
        synchronous_type: SynchronousType::Sync,
        operation_type: OperationType::Adjustment,
        reference_id: 0,
        amount,
        lock_amount,
    }
}

/// Appends every delta whose row passes validation, mimicking the store.
fn build_chain(deltas: &[(Decimal, Decimal)]) -> (Vec<OperationRecord>, usize) {
    let mut history: Vec<OperationRecord> = Vec::new();
    let mut rejected = 0;
    let mut next_id = 1;

    for (amount, lock) in deltas {
        let input = make_input(*amount, *lock);
        let pending = next_record(history.last(), &input, UNALLOCATED_OPERATION_ID, Utc::now());
        if validate_record(&pending).is_err() {
            rejected += 1;
            continue;
        }
        let stored = OperationRecord {
            id: next_id,
            ..pending
        };
        next_id += 1;
        history.push(stored);
    }

    (history, rejected)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_accepted_rows_chain(
        deltas in prop::collection::vec((signed_amount(), signed_lock()), 1..40)
    ) {
        let (history, _) = build_chain(&deltas);
        let state = verify_chain(&history).unwrap();

        let sum: Decimal = history.iter().map(|op| op.amount).sum();
        let locked: Decimal = history.iter().map(|op| op.lock_amount).sum();
        prop_assert_eq!(state.balance, sum);
        prop_assert_eq!(state.total_locked, locked);
    }

    #[test]
    fn prop_accepted_rows_respect_invariants(
        deltas in prop::collection::vec((signed_amount(), signed_lock()), 1..40)
    ) {
        let (history, rejected) = build_chain(&deltas);
        prop_assert_eq!(history.len() + rejected, deltas.len());

        for op in &history {
            prop_assert!(op.balance >= Decimal::ZERO);
            prop_assert!(op.total_locked >= Decimal::ZERO);
            prop_assert!(op.total_locked <= op.balance);
        }
    }

    #[test]
    fn prop_overdraft_rejected(
        start in 0i64..10_000i64,
        extra in 1i64..10_000i64,
    ) {
        let balance = Decimal::new(start, 2);
        let deposit = next_record(None, &make_input(balance, Decimal::ZERO), 1, Utc::now());
        let overdraft = make_input(-(balance + Decimal::new(extra, 2)), Decimal::ZERO);
        let pending = next_record(Some(&deposit), &overdraft, UNALLOCATED_OPERATION_ID, Utc::now());
        prop_assert!(validate_record(&pending).is_err());
    }

    #[test]
    fn prop_rounding_is_idempotent(mantissa in any::<i64>(), scale in 0u32..20) {
        let value = Decimal::new(mantissa, scale);
        let once = round_amount(value);
        prop_assert_eq!(round_amount(once), once);
    }

    #[test]
    fn prop_apply_is_additive(a in signed_amount(), b in signed_amount()) {
        let state = ChainState::EMPTY.apply(a, Decimal::ZERO).apply(b, Decimal::ZERO);
        prop_assert_eq!(state.balance, a + b);
    }
}
