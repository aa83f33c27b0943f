//! Advisory distributed locks.
//!
//! Locks are brokered by a `LockProvider` (an in-process table or a Redis
//! server) and carry a TTL after which they expire on their own. The store
//! does not enforce them: every critical section that mutates ledger or batch
//! state acquires the matching lock itself.
//!
//! Each acquisition gets a fencing token that increases monotonically per
//! provider. Holders call [`LockGuard::ensure_held`] right before committing
//! so that work outliving its TTL is rolled back instead of committed.

pub mod error;
pub mod key;
pub mod lock;
pub mod memory;
pub mod provider;
#[cfg(feature = "redis")]
pub mod redis_provider;

pub use error::LockError;
pub use key::LockKey;
pub use lock::{DEFAULT_TTL, DistributedLock, LockGuard, LockSettings, MAX_TTL, MIN_TTL, clamp_ttl};
pub use memory::MemoryLockProvider;
pub use provider::LockProvider;
#[cfg(feature = "redis")]
pub use redis_provider::RedisLockProvider;
