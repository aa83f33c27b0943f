//! In-process lock provider.
//!
//! Serializes workers of a single process. Deployments with several worker
//! processes use the Redis provider instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use crate::error::LockError;
use crate::key::LockKey;
use crate::provider::LockProvider;

#[derive(Debug)]
struct Holder {
    token: String,
    expires_at: Instant,
}

/// Lock table kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLockProvider {
    holders: DashMap<String, Holder>,
    fencing: AtomicU64,
}

impl MemoryLockProvider {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_fencing_token(&self) -> u64 {
        self.fencing.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl LockProvider for MemoryLockProvider {
    async fn try_acquire(
        &self,
        key: &LockKey,
        token: &str,
        ttl: Duration,
    ) -> Result<Option<u64>, LockError> {
        let now = Instant::now();
        let holder = Holder {
            token: token.to_string(),
            expires_at: now + ttl,
        };

        match self.holders.entry(key.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at > now {
                    return Ok(None);
                }
                tracing::debug!(key = %key, "taking over expired lock");
                entry.insert(holder);
            }
            Entry::Vacant(entry) => {
                entry.insert(holder);
            }
        }

        Ok(Some(self.next_fencing_token()))
    }

    async fn release(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        Ok(self
            .holders
            .remove_if(key.as_str(), |_, holder| holder.token == token)
            .is_some())
    }

    async fn is_held(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        Ok(self
            .holders
            .get(key.as_str())
            .is_some_and(|holder| holder.token == token && holder.expires_at > Instant::now()))
    }
}
