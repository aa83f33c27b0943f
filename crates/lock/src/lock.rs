//! Lock acquisition with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use custody_shared::config::LockConfig;
use uuid::Uuid;

use crate::error::LockError;
use crate::key::LockKey;
use crate::memory::MemoryLockProvider;
use crate::provider::LockProvider;

/// Shortest TTL a lock may carry.
pub const MIN_TTL: Duration = Duration::from_millis(100);

/// Longest TTL a lock may carry.
pub const MAX_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL used when the caller passes zero.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Clamps a requested TTL to `[MIN_TTL, MAX_TTL]`; zero means `DEFAULT_TTL`.
#[must_use]
pub fn clamp_ttl(ttl: Duration) -> Duration {
    if ttl.is_zero() {
        return DEFAULT_TTL;
    }
    ttl.clamp(MIN_TTL, MAX_TTL)
}

/// Acquisition policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// TTL for the `lock_*` shortcuts.
    pub default_ttl: Duration,
    /// Attempts before giving up.
    pub retries: u32,
    /// Linear backoff step: attempt `n` waits `n * backoff_step`.
    pub backoff_step: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            retries: 20,
            backoff_step: Duration::from_millis(25),
        }
    }
}

impl From<&LockConfig> for LockSettings {
    fn from(config: &LockConfig) -> Self {
        Self {
            default_ttl: clamp_ttl(Duration::from_millis(config.default_ttl_ms)),
            retries: config.retries.max(1),
            backoff_step: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Entry point for acquiring locks.
#[derive(Clone)]
pub struct DistributedLock {
    provider: Arc<dyn LockProvider>,
    settings: LockSettings,
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DistributedLock {
    /// Creates a lock client over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LockProvider>, settings: LockSettings) -> Self {
        Self { provider, settings }
    }

    /// Creates a lock client over a fresh in-process table.
    #[must_use]
    pub fn in_memory(settings: LockSettings) -> Self {
        Self::new(Arc::new(MemoryLockProvider::new()), settings)
    }

    /// Acquisition policy in use.
    #[must_use]
    pub const fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Acquires `key` for `ttl` (clamped), retrying with linear backoff.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` once every attempt found the key held, or a
    /// backend error from the provider.
    #[tracing::instrument(skip(self, key), fields(key = %key), err)]
    pub async fn lock(&self, key: LockKey, ttl: Duration) -> Result<LockGuard, LockError> {
        let ttl = clamp_ttl(ttl);
        let token = Uuid::new_v4().to_string();
        let attempts = self.settings.retries.max(1);

        for attempt in 1..=attempts {
            if let Some(fencing_token) = self.provider.try_acquire(&key, &token, ttl).await? {
                tracing::debug!(attempt, fencing_token, "lock acquired");
                return Ok(LockGuard {
                    provider: Arc::clone(&self.provider),
                    key,
                    token,
                    fencing_token,
                    released: false,
                });
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.backoff_step * attempt).await;
            }
        }

        Err(LockError::Exhausted {
            key: key.to_string(),
            attempts,
        })
    }

    /// Locks every ledger mutation of `user_id`.
    ///
    /// # Errors
    ///
    /// See [`Self::lock`].
    pub async fn lock_user(&self, user_id: i64) -> Result<LockGuard, LockError> {
        self.lock(LockKey::user(user_id), self.settings.default_ttl)
            .await
    }

    /// Locks mutations of `account_id`.
    ///
    /// # Errors
    ///
    /// See [`Self::lock`].
    pub async fn lock_account(&self, account_id: i64) -> Result<LockGuard, LockError> {
        self.lock(LockKey::account(account_id), self.settings.default_ttl)
            .await
    }

    /// Locks batch assembly for `network`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for an empty network, otherwise see [`Self::lock`].
    pub async fn lock_batch_network(&self, network: &str) -> Result<LockGuard, LockError> {
        self.lock(LockKey::batch_network(network)?, self.settings.default_ttl)
            .await
    }
}

/// A held lock.
///
/// Call [`LockGuard::unlock`] when done. A guard dropped while still held
/// schedules its release on the current runtime; without a runtime the lock
/// simply expires with its TTL.
pub struct LockGuard {
    provider: Arc<dyn LockProvider>,
    key: LockKey,
    token: String,
    fencing_token: u64,
    released: bool,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("fencing_token", &self.fencing_token)
            .finish_non_exhaustive()
    }
}

impl LockGuard {
    /// Lock key.
    #[must_use]
    pub const fn key(&self) -> &LockKey {
        &self.key
    }

    /// Monotonic token of this acquisition.
    #[must_use]
    pub const fn fencing_token(&self) -> u64 {
        self.fencing_token
    }

    /// Fails if the lock expired or changed hands since it was acquired.
    ///
    /// # Errors
    ///
    /// Returns `Lost` when the lock is no longer held by this guard.
    pub async fn ensure_held(&self) -> Result<(), LockError> {
        if self.provider.is_held(&self.key, &self.token).await? {
            Ok(())
        } else {
            tracing::warn!(key = %self.key, fencing_token = self.fencing_token, "lock lost before commit");
            Err(LockError::Lost(self.key.to_string()))
        }
    }

    /// Releases the lock.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the provider could not be reached. A lock
    /// that already expired is not an error.
    pub async fn unlock(mut self) -> Result<(), LockError> {
        self.released = true;
        if !self.provider.release(&self.key, &self.token).await? {
            tracing::debug!(key = %self.key, "lock expired before unlock");
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let provider = Arc::clone(&self.provider);
        let key = self.key.clone();
        let token = std::mem::take(&mut self.token);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = provider.release(&key, &token).await {
                    tracing::warn!(key = %key, error = %e, "failed to release dropped lock");
                }
            });
        }
    }
}
