//! Account operation chain.
//!
//! This module implements the ledger rules that do not touch storage:
//! - Operation and synchronous types with their canonical encodings
//! - Running-total computation and rounding
//! - Row invariants checked before and after insertion
//! - Whole-history verification
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use balance::{AMOUNT_SCALE, ChainState, next_record, round_amount, verify_chain};
pub use error::LedgerError;
pub use types::{OperationInput, OperationRecord, OperationType, SynchronousType};
pub use validation::{UNALLOCATED_OPERATION_ID, validate_input, validate_record};
