//! Withdraw destinations.
//!
//! A withdraw target is stored as a type tag plus a JSON payload whose shape
//! depends on the tag. Each tag has exactly one decoder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WithdrawError;
use crate::parse::ParseEnumError;

/// Kind of destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawTargetType {
    /// Bitcoin-like on-chain address.
    Onchain,
    /// Liquid sidechain address.
    Liquid,
    /// Lightning invoice.
    Lightning,
    /// SEPA bank transfer.
    Sepa,
    /// SWIFT bank transfer.
    Swift,
    /// Card payout.
    Card,
}

impl WithdrawTargetType {
    /// Canonical string encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onchain => "onchain",
            Self::Liquid => "liquid",
            Self::Lightning => "lightning",
            Self::Sepa => "sepa",
            Self::Swift => "swift",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for WithdrawTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawTargetType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onchain" => Ok(Self::Onchain),
            "liquid" => Ok(Self::Liquid),
            "lightning" => Ok(Self::Lightning),
            "sepa" => Ok(Self::Sepa),
            "swift" => Ok(Self::Swift),
            "card" => Ok(Self::Card),
            _ => Err(ParseEnumError::new("withdraw target type", s)),
        }
    }
}

/// On-chain destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnchainTarget {
    /// Network name, e.g. `bitcoin`.
    pub chain: String,
    /// Destination address.
    pub public_key: String,
}

/// Liquid destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidTarget {
    /// Network name, e.g. `liquid`.
    pub chain: String,
    /// Confidential destination address.
    pub public_key: String,
}

/// Lightning destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningTarget {
    /// BOLT11 invoice.
    pub invoice: String,
}

/// SEPA destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SepaTarget {
    /// Beneficiary name.
    pub beneficiary: String,
    /// Account IBAN.
    pub iban: String,
    /// Bank BIC.
    pub bic: String,
}

/// SWIFT destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwiftTarget {
    /// Beneficiary name.
    pub beneficiary: String,
    /// ISO country code of the bank.
    pub country_code: String,
    /// Bank SWIFT code.
    pub bank_code: String,
    /// Account number.
    pub account_number: String,
}

/// Card destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTarget {
    /// Card number.
    pub pan: String,
}

/// Decoded destination payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawTargetData {
    /// See [`OnchainTarget`].
    Onchain(OnchainTarget),
    /// See [`LiquidTarget`].
    Liquid(LiquidTarget),
    /// See [`LightningTarget`].
    Lightning(LightningTarget),
    /// See [`SepaTarget`].
    Sepa(SepaTarget),
    /// See [`SwiftTarget`].
    Swift(SwiftTarget),
    /// See [`CardTarget`].
    Card(CardTarget),
}

fn decode_as<T: for<'de> Deserialize<'de>>(
    target_type: WithdrawTargetType,
    data: &Value,
) -> Result<T, WithdrawError> {
    T::deserialize(data).map_err(|e| WithdrawError::PayloadDecode {
        target_type,
        reason: e.to_string(),
    })
}

impl WithdrawTargetData {
    /// Decodes a stored payload according to its tag.
    ///
    /// # Errors
    ///
    /// Returns `PayloadDecode` if the payload does not match the tag's shape.
    pub fn decode(target_type: WithdrawTargetType, data: &Value) -> Result<Self, WithdrawError> {
        Ok(match target_type {
            WithdrawTargetType::Onchain => Self::Onchain(decode_as(target_type, data)?),
            WithdrawTargetType::Liquid => Self::Liquid(decode_as(target_type, data)?),
            WithdrawTargetType::Lightning => Self::Lightning(decode_as(target_type, data)?),
            WithdrawTargetType::Sepa => Self::Sepa(decode_as(target_type, data)?),
            WithdrawTargetType::Swift => Self::Swift(decode_as(target_type, data)?),
            WithdrawTargetType::Card => Self::Card(decode_as(target_type, data)?),
        })
    }

    /// Decodes a stored payload given its tag as a string.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTargetType` for an unrecognized tag, otherwise as [`Self::decode`].
    pub fn decode_tagged(tag: &str, data: &Value) -> Result<Self, WithdrawError> {
        let target_type = tag
            .parse()
            .map_err(|_| WithdrawError::UnknownTargetType(tag.to_string()))?;
        Self::decode(target_type, data)
    }

    /// Tag of this payload.
    #[must_use]
    pub const fn target_type(&self) -> WithdrawTargetType {
        match self {
            Self::Onchain(_) => WithdrawTargetType::Onchain,
            Self::Liquid(_) => WithdrawTargetType::Liquid,
            Self::Lightning(_) => WithdrawTargetType::Lightning,
            Self::Sepa(_) => WithdrawTargetType::Sepa,
            Self::Swift(_) => WithdrawTargetType::Swift,
            Self::Card(_) => WithdrawTargetType::Card,
        }
    }

    /// Encodes the payload for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Onchain(t) => serde_json::to_value(t),
            Self::Liquid(t) => serde_json::to_value(t),
            Self::Lightning(t) => serde_json::to_value(t),
            Self::Sepa(t) => serde_json::to_value(t),
            Self::Swift(t) => serde_json::to_value(t),
            Self::Card(t) => serde_json::to_value(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_onchain() {
        let data = json!({ "chain": "bitcoin", "public_key": "bc1qxyz" });
        let decoded = WithdrawTargetData::decode(WithdrawTargetType::Onchain, &data).unwrap();
        assert_eq!(
            decoded,
            WithdrawTargetData::Onchain(OnchainTarget {
                chain: "bitcoin".to_string(),
                public_key: "bc1qxyz".to_string(),
            })
        );
        assert_eq!(decoded.target_type(), WithdrawTargetType::Onchain);
    }

    #[test]
    fn test_decode_sepa() {
        let data = json!({ "beneficiary": "Alice", "iban": "CH93 0076 2011 6238 5295 7", "bic": "POFICHBEXXX" });
        let decoded = WithdrawTargetData::decode(WithdrawTargetType::Sepa, &data).unwrap();
        assert!(matches!(decoded, WithdrawTargetData::Sepa(ref t) if t.bic == "POFICHBEXXX"));
    }

    #[test]
    fn test_decode_mismatched_payload() {
        let data = json!({ "chain": 5 });
        let err = WithdrawTargetData::decode(WithdrawTargetType::Onchain, &data).unwrap_err();
        assert!(matches!(
            err,
            WithdrawError::PayloadDecode {
                target_type: WithdrawTargetType::Onchain,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let err = WithdrawTargetData::decode_tagged("paypal", &json!({})).unwrap_err();
        assert_eq!(err, WithdrawError::UnknownTargetType("paypal".to_string()));
    }

    #[test]
    fn test_encode_then_decode_lightning() {
        let data = WithdrawTargetData::Lightning(LightningTarget {
            invoice: "lnbc1...".to_string(),
        });
        let json = data.to_json().unwrap();
        assert_eq!(
            WithdrawTargetData::decode_tagged("lightning", &json).unwrap(),
            data
        );
    }
}
