//! Services that wrap repositories in locks and transactions.
//!
//! Every mutation of ledger or batch state acquires the matching distributed
//! lock before it opens its transaction, checks the lock is still held right
//! before commit, and releases it on every path.

pub mod account;
pub mod error;
pub mod ledger;
pub mod processor;

use std::sync::Arc;

use custody_core::batch::BatchSettings;
use custody_core::settlement::WalletGateway;
use custody_lock::{DistributedLock, LockGuard};
use sea_orm::DatabaseConnection;

pub use account::AccountService;
pub use error::ServiceError;
pub use ledger::{LedgerService, TransferInput, TransferReceipt};
pub use processor::{BatchPass, ChainReport, GroupReport, ProcessReport, WithdrawalProcessor};

/// Collaborators shared by every service.
#[derive(Clone)]
pub struct ServiceContext {
    /// Relational store.
    pub db: DatabaseConnection,
    /// Distributed lock client.
    pub lock: DistributedLock,
    /// Settlement submission API.
    pub gateway: Arc<dyn WalletGateway>,
    /// Parameters of newly created batches.
    pub batch: BatchSettings,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("lock", &self.lock)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

impl ServiceContext {
    /// Bundles the collaborators.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        lock: DistributedLock,
        gateway: Arc<dyn WalletGateway>,
        batch: BatchSettings,
    ) -> Self {
        Self {
            db,
            lock,
            gateway,
            batch,
        }
    }
}

/// Releases a lock, logging instead of failing.
pub(crate) async fn release(guard: LockGuard) {
    let key = guard.key().clone();
    if let Err(e) = guard.unlock().await {
        tracing::warn!(key = %key, error = %e, "failed to release lock");
    }
}
