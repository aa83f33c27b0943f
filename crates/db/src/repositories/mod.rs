//! Repository layer for database operations.

pub mod account;
pub mod batch;
pub mod error;
pub mod ledger;
pub mod withdraw;

pub use account::{AccountInfo, AccountRepository, AccountStateGuard};
pub use batch::BatchRepository;
pub use error::StoreError;
pub use ledger::{LastOperationIndex, LedgerRepository, QueryLastOperation};
pub use withdraw::{CreateWithdrawInput, WithdrawDetails, WithdrawRepository};
