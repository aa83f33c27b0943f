//! Redis lock provider.
//!
//! Acquisition is `SET key token NX PX ttl`. Release and ownership checks
//! compare the stored token so a holder never frees a lock it lost. Fencing
//! tokens come from `INCR` on a companion counter key.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};

use crate::error::LockError;
use crate::key::LockKey;
use crate::provider::LockProvider;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Lock table kept in a Redis server.
#[derive(Clone)]
pub struct RedisLockProvider {
    conn: MultiplexedConnection,
    release: Script,
}

impl std::fmt::Debug for RedisLockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockProvider").finish_non_exhaustive()
    }
}

impl RedisLockProvider {
    /// Connects to the Redis server at `url`.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, LockError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to Redis lock backend");
        Ok(Self {
            conn,
            release: Script::new(RELEASE_SCRIPT),
        })
    }

    fn fence_key(key: &LockKey) -> String {
        format!("{key}:fence")
    }
}

#[async_trait]
impl LockProvider for RedisLockProvider {
    async fn try_acquire(
        &self,
        key: &LockKey,
        token: &str,
        ttl: Duration,
    ) -> Result<Option<u64>, LockError> {
        let mut conn = self.conn.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        let acquired: Option<String> = redis::cmd("SET")
            .arg(key.as_str())
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        if acquired.is_none() {
            return Ok(None);
        }

        let fencing_token: u64 = conn.incr(Self::fence_key(key), 1_u64).await?;
        Ok(Some(fencing_token))
    }

    async fn release(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release
            .key(key.as_str())
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    async fn is_held(&self, key: &LockKey, token: &str) -> Result<bool, LockError> {
        let mut conn = self.conn.clone();
        let current: Option<String> = conn.get(key.as_str()).await?;
        Ok(current.as_deref() == Some(token))
    }
}
