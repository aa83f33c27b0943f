//! Withdraw statuses, destinations and per-item checks.

pub mod error;
pub mod target;
pub mod types;

pub use error::{WithdrawError, ensure_transition};
pub use target::{
    CardTarget, LightningTarget, LiquidTarget, OnchainTarget, SepaTarget, SwiftTarget,
    WithdrawTargetData, WithdrawTargetType,
};
pub use types::{BatchMode, RejectReason, WithdrawStatus, check_onchain_item, is_unprocessed};
