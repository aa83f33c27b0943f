//! Application configuration management.

use std::collections::HashMap;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Distributed lock configuration.
    #[serde(default)]
    pub lock: LockConfig,
    /// Batch assembly defaults.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Message worker configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Which lock service backs the distributed lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    /// In-process lock table, single node only.
    #[default]
    Memory,
    /// Redis server shared by every worker.
    Redis,
}

/// Distributed lock configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// Lock backend.
    #[serde(default)]
    pub backend: LockBackend,
    /// Redis URL, required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// TTL used when callers do not pass one, in milliseconds.
    #[serde(default = "default_lock_ttl_ms")]
    pub default_ttl_ms: u64,
    /// Acquisition attempts before giving up.
    #[serde(default = "default_lock_retries")]
    pub retries: u32,
    /// Linear backoff step between attempts, in milliseconds.
    #[serde(default = "default_lock_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: LockBackend::default(),
            redis_url: None,
            default_ttl_ms: default_lock_ttl_ms(),
            retries: default_lock_retries(),
            backoff_ms: default_lock_backoff_ms(),
        }
    }
}

fn default_lock_ttl_ms() -> u64 {
    30_000
}

fn default_lock_retries() -> u32 {
    20
}

fn default_lock_backoff_ms() -> u64 {
    25
}

/// Batch assembly defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of withdraws attached to one batch.
    #[serde(default = "default_batch_capacity")]
    pub capacity: u32,
    /// Delay between batch creation and its execution deadline, in seconds.
    #[serde(default = "default_execute_after_secs")]
    pub execute_after_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            capacity: default_batch_capacity(),
            execute_after_secs: default_execute_after_secs(),
        }
    }
}

fn default_batch_capacity() -> u32 {
    16
}

fn default_execute_after_secs() -> u64 {
    3600 // 1 hour
}

/// Message worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Pool size per message subject. Subjects not listed use `default_pool_size`.
    #[serde(default)]
    pub pools: HashMap<String, usize>,
    /// Pool size for subjects without an explicit entry.
    #[serde(default = "default_pool_size")]
    pub default_pool_size: usize,
    /// Interval between automatic withdraw processing passes, in seconds. Zero disables it.
    #[serde(default = "default_process_interval_secs")]
    pub process_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pools: HashMap::new(),
            default_pool_size: default_pool_size(),
            process_interval_secs: default_process_interval_secs(),
        }
    }
}

impl WorkerConfig {
    /// Returns the pool size configured for `subject`.
    #[must_use]
    pub fn pool_size(&self, subject: &str) -> usize {
        self.pools
            .get(subject)
            .copied()
            .unwrap_or(self.default_pool_size)
            .max(1)
    }
}

fn default_pool_size() -> usize {
    8
}

fn default_process_interval_secs() -> u64 {
    60
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CUSTODY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("CUSTODY__DATABASE__URL", Some("postgres://localhost/custody")),
                ("CUSTODY__LOCK__BACKEND", Some("redis")),
                ("CUSTODY__LOCK__REDIS_URL", Some("redis://localhost:6379")),
                ("CUSTODY__BATCH__CAPACITY", Some("32")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/custody");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.lock.backend, LockBackend::Redis);
                assert_eq!(
                    config.lock.redis_url.as_deref(),
                    Some("redis://localhost:6379")
                );
                assert_eq!(config.lock.default_ttl_ms, 30_000);
                assert_eq!(config.batch.capacity, 32);
                assert_eq!(config.batch.execute_after_secs, 3600);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars_unset(["CUSTODY__DATABASE__URL"], || {
            assert!(AppConfig::load().is_err());
        });
    }

    #[test]
    fn test_worker_pool_size_fallback() {
        let mut worker = WorkerConfig::default();
        worker.pools.insert("withdraw.process".to_string(), 4);
        worker.pools.insert("account.history".to_string(), 0);

        assert_eq!(worker.pool_size("withdraw.process"), 4);
        assert_eq!(worker.pool_size("account.operation"), 8);
        assert_eq!(worker.pool_size("account.history"), 1);
    }
}
