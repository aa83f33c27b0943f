//! Batch error types.

use custody_shared::ErrorKind;
use thiserror::Error;

use super::types::{BatchInfoType, BatchStatus};

/// Errors that can occur while assembling or advancing batches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Network name is empty.
    #[error("Batch network cannot be empty")]
    InvalidNetwork,

    /// Capacity is zero.
    #[error("Batch capacity must be positive")]
    InvalidCapacity,

    /// Stored capacity of a batch is not positive.
    #[error("Batch {batch_id} has corrupt capacity {capacity}")]
    CorruptCapacity {
        /// Batch id.
        batch_id: i64,
        /// Stored capacity.
        capacity: i32,
    },

    /// Batch id is zero or negative.
    #[error("Invalid batch id")]
    InvalidBatchId,

    /// Batch not found.
    #[error("Batch not found: {0}")]
    NotFound(i64),

    /// Batch has no status history.
    #[error("Batch {0} has no status history")]
    EmptyHistory(i64),

    /// Info payload does not match its tag.
    #[error("Cannot decode {info_type} batch info: {reason}")]
    PayloadDecode {
        /// Tag of the payload.
        info_type: BatchInfoType,
        /// Decoder message.
        reason: String,
    },

    /// Status change not allowed.
    #[error("Cannot change batch status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: BatchStatus,
        /// Requested status.
        to: BatchStatus,
    },
}

impl BatchError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidNetwork
            | Self::InvalidCapacity
            | Self::InvalidBatchId
            | Self::PayloadDecode { .. } => ErrorKind::Validation,
            Self::NotFound(_) | Self::EmptyHistory(_) => ErrorKind::NotFound,
            Self::InvalidStatusTransition { .. } => ErrorKind::StateConflict,
            Self::CorruptCapacity { .. } => ErrorKind::Internal,
        }
    }
}

/// Checks a status change against the batch state machine.
///
/// # Errors
///
/// Returns `InvalidStatusTransition` if the change is not allowed.
pub fn ensure_transition(from: BatchStatus, to: BatchStatus) -> Result<(), BatchError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(BatchError::InvalidStatusTransition { from, to })
    }
}
