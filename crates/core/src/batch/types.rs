//! Settlement batch statuses, info payloads and defaults.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use custody_shared::config::BatchConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::BatchError;
use crate::parse::ParseEnumError;

/// Default number of withdraws per batch.
pub const DEFAULT_BATCH_CAPACITY: u32 = 16;

/// Default delay before a batch's execution deadline, in seconds.
pub const DEFAULT_EXECUTE_AFTER_SECS: i64 = 3600;

/// Longest accepted delay before a batch's execution deadline, in seconds.
pub const MAX_EXECUTE_AFTER_SECS: u64 = 366 * 24 * 3600;

/// Status of a batch. The current status is the latest info row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Open, accepting withdraws.
    Created,
    /// Closed by the scheduler, waiting for submission.
    Ready,
    /// Submitted to the wallet gateway.
    Processing,
    /// Confirmed.
    Settled,
    /// Abandoned.
    Canceled,
}

impl BatchStatus {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Ready => "ready",
            Self::Processing => "processing",
            Self::Settled => "settled",
            Self::Canceled => "canceled",
        }
    }

    /// Returns true if the status may change to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Ready | Self::Processing | Self::Canceled)
                | (Self::Ready, Self::Processing | Self::Canceled)
                | (Self::Processing, Self::Settled | Self::Canceled)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "ready" => Ok(Self::Ready),
            "processing" => Ok(Self::Processing),
            "settled" => Ok(Self::Settled),
            "canceled" => Ok(Self::Canceled),
            _ => Err(ParseEnumError::new("batch status", s)),
        }
    }
}

/// Tag of a batch info payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchInfoType {
    /// No payload.
    None,
    /// On-chain submission receipt.
    Crypto,
}

impl BatchInfoType {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Crypto => "crypto",
        }
    }
}

impl fmt::Display for BatchInfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchInfoType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "crypto" => Ok(Self::Crypto),
            _ => Err(ParseEnumError::new("batch info type", s)),
        }
    }
}

/// Receipt of an on-chain submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoInfo {
    /// Transaction id returned by the gateway.
    pub tx_id: String,
}

/// Decoded batch info payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInfoData {
    /// No payload.
    None,
    /// See [`CryptoInfo`].
    Crypto(CryptoInfo),
}

impl BatchInfoData {
    /// Decodes a stored payload according to its tag.
    ///
    /// # Errors
    ///
    /// Returns `PayloadDecode` if the payload does not match the tag's shape.
    pub fn decode(info_type: BatchInfoType, data: &Value) -> Result<Self, BatchError> {
        match info_type {
            BatchInfoType::None => Ok(Self::None),
            BatchInfoType::Crypto => CryptoInfo::deserialize(data)
                .map(Self::Crypto)
                .map_err(|e| BatchError::PayloadDecode {
                    info_type,
                    reason: e.to_string(),
                }),
        }
    }

    /// Tag of this payload.
    #[must_use]
    pub const fn info_type(&self) -> BatchInfoType {
        match self {
            Self::None => BatchInfoType::None,
            Self::Crypto(_) => BatchInfoType::Crypto,
        }
    }

    /// Encodes the payload for storage.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::None => Value::Object(serde_json::Map::new()),
            Self::Crypto(info) => serde_json::json!({ "tx_id": info.tx_id }),
        }
    }
}

/// Parameters of newly created batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Maximum number of withdraws per batch.
    pub capacity: u32,
    /// Delay between creation and execution deadline.
    pub execute_after: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BATCH_CAPACITY,
            execute_after: Duration::seconds(DEFAULT_EXECUTE_AFTER_SECS),
        }
    }
}

impl BatchSettings {
    /// Builds settings, rejecting a zero capacity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: u32, execute_after: Duration) -> Result<Self, BatchError> {
        if capacity == 0 {
            return Err(BatchError::InvalidCapacity);
        }
        Ok(Self {
            capacity,
            execute_after,
        })
    }

    /// Builds settings from configuration. The delay is capped at
    /// [`MAX_EXECUTE_AFTER_SECS`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidCapacity` when the configured capacity is zero.
    pub fn from_config(config: &BatchConfig) -> Result<Self, BatchError> {
        let secs = i64::try_from(config.execute_after_secs.min(MAX_EXECUTE_AFTER_SECS))
            .unwrap_or(DEFAULT_EXECUTE_AFTER_SECS);
        Self::new(config.capacity, Duration::seconds(secs))
    }

    /// Execution deadline of a batch created at `now`.
    #[must_use]
    pub fn deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.execute_after
    }
}

/// Number of withdraws a batch can still take.
#[must_use]
pub fn remaining_capacity(capacity: u32, attached: u64) -> usize {
    usize::try_from(u64::from(capacity).saturating_sub(attached)).unwrap_or(usize::MAX)
}

/// Checks a network name used as a batch key.
///
/// # Errors
///
/// Returns `InvalidNetwork` for an empty name.
pub fn validate_network(network: &str) -> Result<(), BatchError> {
    if network.trim().is_empty() {
        return Err(BatchError::InvalidNetwork);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_transitions() {
        assert!(BatchStatus::Created.can_transition_to(BatchStatus::Processing));
        assert!(BatchStatus::Created.can_transition_to(BatchStatus::Ready));
        assert!(BatchStatus::Ready.can_transition_to(BatchStatus::Processing));
        assert!(BatchStatus::Processing.can_transition_to(BatchStatus::Settled));
        assert!(!BatchStatus::Settled.can_transition_to(BatchStatus::Created));
        assert!(!BatchStatus::Processing.can_transition_to(BatchStatus::Created));
        assert!(!BatchStatus::Created.can_transition_to(BatchStatus::Settled));
    }

    #[test]
    fn test_default_settings() {
        let settings = BatchSettings::default();
        assert_eq!(settings.capacity, 16);
        let now = Utc::now();
        assert_eq!(settings.deadline_from(now) - now, Duration::hours(1));
        assert!(BatchSettings::new(0, Duration::hours(1)).is_err());
    }

    #[test]
    fn test_remaining_capacity() {
        assert_eq!(remaining_capacity(16, 0), 16);
        assert_eq!(remaining_capacity(16, 15), 1);
        assert_eq!(remaining_capacity(16, 20), 0);
    }

    #[test]
    fn test_info_payloads() {
        let data = BatchInfoData::decode(BatchInfoType::Crypto, &json!({ "tx_id": "abc" })).unwrap();
        assert_eq!(
            data,
            BatchInfoData::Crypto(CryptoInfo {
                tx_id: "abc".to_string()
            })
        );
        assert_eq!(data.to_json(), json!({ "tx_id": "abc" }));
        assert_eq!(
            BatchInfoData::decode(BatchInfoType::None, &json!(null)).unwrap(),
            BatchInfoData::None
        );
        assert!(BatchInfoData::decode(BatchInfoType::Crypto, &json!({})).is_err());
    }

    #[test]
    fn test_validate_network() {
        assert!(validate_network("bitcoin").is_ok());
        assert!(validate_network("").is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = BatchSettings::from_config(&BatchConfig {
            capacity: 4,
            execute_after_secs: 90,
        })
        .unwrap();
        assert_eq!(settings.capacity, 4);
        assert_eq!(settings.execute_after, Duration::seconds(90));

        let capped = BatchSettings::from_config(&BatchConfig {
            capacity: 1,
            execute_after_secs: u64::MAX,
        })
        .unwrap();
        assert_eq!(
            capped.execute_after,
            Duration::seconds(i64::try_from(MAX_EXECUTE_AFTER_SECS).unwrap())
        );

        assert_eq!(
            BatchSettings::from_config(&BatchConfig {
                capacity: 0,
                execute_after_secs: 60,
            }),
            Err(BatchError::InvalidCapacity)
        );
    }
}
