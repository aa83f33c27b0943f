//! Lock provider seam.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockError;
use crate::key::LockKey;

/// A service that brokers mutual exclusion between workers.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Takes `key` for `token` if it is free or expired.
    ///
    /// Returns the fencing token of the new acquisition, or `None` while
    /// another holder owns the key.
    async fn try_acquire(
        &self,
        key: &LockKey,
        token: &str,
        ttl: Duration,
    ) -> Result<Option<u64>, LockError>;

    /// Frees `key` if `token` still owns it. Returns whether it did.
    async fn release(&self, key: &LockKey, token: &str) -> Result<bool, LockError>;

    /// Returns true while `token` owns an unexpired `key`.
    async fn is_held(&self, key: &LockKey, token: &str) -> Result<bool, LockError>;
}
