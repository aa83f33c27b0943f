//! Wire format of worker requests and responses.
//!
//! Every line on the transport is one JSON envelope:
//! `{"id": "...", "subject": "account.operation", "payload": {...}}`.
//! Responses echo the id and subject and carry either `data` or `error`.

use custody_core::ledger::OperationInput;
use custody_core::withdraw::{BatchMode, WithdrawTargetType};
use custody_db::services::TransferInput;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subject of account creation requests.
pub const ACCOUNT_CREATE: &str = "account.create";
/// Subject of ledger append requests.
pub const ACCOUNT_OPERATION: &str = "account.operation";
/// Subject of history queries.
pub const ACCOUNT_HISTORY: &str = "account.history";
/// Subject of transfers.
pub const ACCOUNT_TRANSFER: &str = "account.transfer";
/// Subject of withdraw creation requests.
pub const WITHDRAW_CREATE: &str = "withdraw.create";
/// Subject of withdraw processing passes.
pub const WITHDRAW_PROCESS: &str = "withdraw.process";

/// Every subject the worker serves.
pub const SUBJECTS: [&str; 6] = [
    ACCOUNT_CREATE,
    ACCOUNT_OPERATION,
    ACCOUNT_HISTORY,
    ACCOUNT_TRANSFER,
    WITHDRAW_CREATE,
    WITHDRAW_PROCESS,
];

/// Incoming message before its payload is decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Correlation id echoed in the response.
    #[serde(default)]
    pub id: Option<String>,
    /// Subject selecting the handler and worker pool.
    pub subject: String,
    /// Subject-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Envelope for a scheduled processing pass.
    #[must_use]
    pub fn process_tick() -> Self {
        Self {
            id: None,
            subject: WITHDRAW_PROCESS.to_string(),
            payload: Value::Null,
        }
    }
}

/// `account.create` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    /// Owner.
    pub user_id: i64,
    /// Currency name, e.g. `BTC`.
    pub currency: String,
    /// Display name.
    pub name: String,
}

/// `account.history` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRequest {
    /// Account to read.
    pub account_id: i64,
}

/// `withdraw.create` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWithdrawRequest {
    /// Account the funds leave.
    pub from_account_id: i64,
    /// Account credited on settlement.
    pub to_account_id: i64,
    /// Amount to send.
    pub amount: Decimal,
    /// Requested urgency.
    #[serde(default)]
    pub batch_mode: BatchMode,
    /// Destination type tag.
    pub target_type: WithdrawTargetType,
    /// Destination payload matching `target_type`.
    pub target: Value,
}

/// Decoded request.
#[derive(Debug, Clone)]
pub enum Request {
    /// See [`CreateAccountRequest`].
    CreateAccount(CreateAccountRequest),
    /// Append one ledger operation.
    AppendOperation(OperationInput),
    /// See [`HistoryRequest`].
    History(HistoryRequest),
    /// Move funds between two accounts.
    Transfer(TransferInput),
    /// See [`CreateWithdrawRequest`].
    CreateWithdraw(CreateWithdrawRequest),
    /// Run one processing pass over `created` withdraws.
    ProcessWithdraws,
}

/// Why an envelope could not be turned into a [`Request`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No handler exists for the subject.
    #[error("Unknown subject '{0}'")]
    UnknownSubject(String),

    /// The payload does not match the subject's shape.
    #[error("Invalid {subject} payload: {source}")]
    Payload {
        /// Subject of the envelope.
        subject: String,
        /// Decoder error.
        source: serde_json::Error,
    },
}

impl Request {
    /// Decodes the payload of `envelope` according to its subject.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSubject` or `Payload`.
    pub fn decode(envelope: &Envelope) -> Result<Self, DecodeError> {
        let payload = envelope.payload.clone();
        let decoded = match envelope.subject.as_str() {
            ACCOUNT_CREATE => serde_json::from_value(payload).map(Self::CreateAccount),
            ACCOUNT_OPERATION => serde_json::from_value(payload).map(Self::AppendOperation),
            ACCOUNT_HISTORY => serde_json::from_value(payload).map(Self::History),
            ACCOUNT_TRANSFER => serde_json::from_value(payload).map(Self::Transfer),
            WITHDRAW_CREATE => serde_json::from_value(payload).map(Self::CreateWithdraw),
            WITHDRAW_PROCESS => Ok(Self::ProcessWithdraws),
            other => return Err(DecodeError::UnknownSubject(other.to_string())),
        };
        decoded.map_err(|source| DecodeError::Payload {
            subject: envelope.subject.clone(),
            source,
        })
    }
}

/// Error part of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: String,
    /// Whether the same request may succeed later.
    pub retryable: bool,
    /// Human-readable message.
    pub message: String,
}

/// Outgoing message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Correlation id of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Subject of the request.
    pub subject: String,
    /// Result data on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    /// Successful response.
    #[must_use]
    pub fn success(id: Option<String>, subject: impl Into<String>, data: Value) -> Self {
        Self {
            id,
            subject: subject.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Failed response.
    #[must_use]
    pub fn failure(id: Option<String>, subject: impl Into<String>, error: ErrorBody) -> Self {
        Self {
            id,
            subject: subject.into(),
            data: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_core::ledger::OperationType;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn envelope(subject: &str, payload: Value) -> Envelope {
        Envelope {
            id: Some("1".to_string()),
            subject: subject.to_string(),
            payload,
        }
    }

    #[test]
    fn test_decode_operation() {
        let request = Request::decode(&envelope(
            ACCOUNT_OPERATION,
            json!({
                "account_id": 3,
                "synchronous_type": "sync",
                "operation_type": "deposit",
                "reference_id": 9,
                "amount": "1.5",
                "lock_amount": "0"
            }),
        ))
        .unwrap();

        match request {
            Request::AppendOperation(input) => {
                assert_eq!(input.account_id, 3);
                assert_eq!(input.operation_type, OperationType::Deposit);
                assert_eq!(input.amount, dec!(1.5));
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_decode_withdraw_defaults_batch_mode() {
        let request = Request::decode(&envelope(
            WITHDRAW_CREATE,
            json!({
                "from_account_id": 1,
                "to_account_id": 2,
                "amount": "0.25",
                "target_type": "onchain",
                "target": {"chain": "bitcoin", "public_key": "bc1q"}
            }),
        ))
        .unwrap();

        match request {
            Request::CreateWithdraw(req) => {
                assert_eq!(req.batch_mode, BatchMode::default());
                assert_eq!(req.target_type, WithdrawTargetType::Onchain);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            Request::decode(&envelope("account.delete", Value::Null)),
            Err(DecodeError::UnknownSubject(_))
        ));
        assert!(matches!(
            Request::decode(&envelope(ACCOUNT_HISTORY, json!({"account": 1}))),
            Err(DecodeError::Payload { .. })
        ));
        assert!(matches!(
            Request::decode(&envelope(WITHDRAW_PROCESS, Value::Null)),
            Ok(Request::ProcessWithdraws)
        ));
    }

    #[test]
    fn test_response_serialization() {
        let ok = Response::success(None, WITHDRAW_PROCESS, json!({"processing": []}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"subject": "withdraw.process", "data": {"processing": []}})
        );

        let failed = Response::failure(
            Some("7".to_string()),
            ACCOUNT_OPERATION,
            ErrorBody {
                code: "ACCOUNT_IS_DISABLED".to_string(),
                retryable: false,
                message: "Account 3 is disabled".to_string(),
            },
        );
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["id"], "7");
        assert_eq!(value["error"]["code"], "ACCOUNT_IS_DISABLED");
        assert!(value.get("data").is_none());
    }
}
