//! Lock keys.

use std::fmt;

use crate::error::LockError;

const PREFIX: &str = "custody:lock";

/// Name of a lock. Keys are namespaced by what they serialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    /// Serializes every ledger mutation of one user.
    #[must_use]
    pub fn user(user_id: i64) -> Self {
        Self(format!("{PREFIX}:user:{user_id}"))
    }

    /// Serializes mutations of one account.
    #[must_use]
    pub fn account(account_id: i64) -> Self {
        Self(format!("{PREFIX}:account:{account_id}"))
    }

    /// Serializes batch assembly for one destination network.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for an empty network name.
    pub fn batch_network(network: &str) -> Result<Self, LockError> {
        let network = network.trim();
        if network.is_empty() {
            return Err(LockError::InvalidKey("empty network".to_string()));
        }
        Ok(Self(format!("{PREFIX}:batch:{network}")))
    }

    /// The key as sent to the lock provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
