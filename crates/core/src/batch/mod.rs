//! Settlement batches.
//!
//! A batch groups withdraws bound for one network. Its status history is
//! append-only; only `created -> processing` is driven by withdraw
//! processing, the other edges belong to the scheduler and the settlement
//! watcher.

pub mod error;
pub mod types;

pub use error::{BatchError, ensure_transition};
pub use types::{
    BatchInfoData, BatchInfoType, BatchSettings, BatchStatus, CryptoInfo, DEFAULT_BATCH_CAPACITY,
    DEFAULT_EXECUTE_AFTER_SECS, MAX_EXECUTE_AFTER_SECS, remaining_capacity, validate_network,
};
