//! Core accounting rules for the custody platform.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, invariants and state machines live here.
//!
//! # Modules
//!
//! - `ledger` - Operation chain arithmetic and invariants
//! - `account` - Account status gate
//! - `withdraw` - Withdraw statuses and destination payloads
//! - `batch` - Settlement batch statuses and defaults
//! - `settlement` - Wallet gateway seam

pub mod account;
pub mod batch;
pub mod ledger;
pub mod parse;
pub mod settlement;
pub mod withdraw;

pub use parse::ParseEnumError;
