//! Request dispatch with one bounded worker pool per subject.

use std::collections::HashMap;
use std::sync::Arc;

use custody_core::withdraw::WithdrawTargetData;
use custody_db::repositories::{AccountInfo, CreateWithdrawInput, StoreError, WithdrawRepository};
use custody_db::services::{ProcessReport, ServiceError};
use custody_db::{AccountService, LedgerService, ServiceContext, WithdrawalProcessor};
use custody_shared::ErrorKind;
use custody_shared::config::WorkerConfig;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use crate::messages::{
    CreateAccountRequest, CreateWithdrawRequest, DecodeError, Envelope, ErrorBody, Request,
    Response, SUBJECTS,
};

/// Why a request failed.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The envelope could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The handler failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The subject's pool no longer accepts work.
    #[error("Worker pool for '{0}' is closed")]
    PoolClosed(String),

    /// The result could not be encoded.
    #[error("Cannot encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        Self::Service(err.into())
    }
}

impl DispatchError {
    /// Error part of the response.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let (code, kind) = match self {
            Self::Decode(DecodeError::UnknownSubject(_)) => ("UNKNOWN_SUBJECT", ErrorKind::Validation),
            Self::Decode(DecodeError::Payload { .. }) => ("INVALID_PAYLOAD", ErrorKind::Validation),
            Self::Service(e) => (e.error_code(), e.kind()),
            Self::PoolClosed(_) => ("SHUTTING_DOWN", ErrorKind::Concurrency),
            Self::Encode(_) => ("INTERNAL_ERROR", ErrorKind::Internal),
        };
        ErrorBody {
            code: code.to_string(),
            retryable: kind.is_retryable(),
            message: self.to_string(),
        }
    }
}

/// Routes requests to services.
pub struct Dispatcher {
    accounts: AccountService,
    ledger: LedgerService,
    withdraws: WithdrawRepository,
    processor: WithdrawalProcessor,
    pools: HashMap<&'static str, Arc<Semaphore>>,
}

impl Dispatcher {
    /// Creates a dispatcher with pools sized by `config`.
    #[must_use]
    pub fn new(ctx: ServiceContext, config: &WorkerConfig) -> Self {
        let pools = SUBJECTS
            .iter()
            .map(|&subject| {
                let size = config.pool_size(subject);
                tracing::debug!(subject, size, "worker pool");
                (subject, Arc::new(Semaphore::new(size)))
            })
            .collect();
        Self {
            accounts: AccountService::new(ctx.clone()),
            ledger: LedgerService::new(ctx.clone()),
            withdraws: WithdrawRepository::new(ctx.db.clone()),
            processor: WithdrawalProcessor::new(ctx),
            pools,
        }
    }

    /// Handles one envelope and builds its response.
    pub async fn dispatch(&self, envelope: Envelope) -> Response {
        match self.run(&envelope).await {
            Ok(data) => {
                tracing::debug!(subject = %envelope.subject, id = ?envelope.id, "request handled");
                Response::success(envelope.id, envelope.subject, data)
            }
            Err(e) => {
                tracing::warn!(subject = %envelope.subject, id = ?envelope.id, error = %e, "request failed");
                let body = e.body();
                Response::failure(envelope.id, envelope.subject, body)
            }
        }
    }

    /// Stops every pool from accepting new work.
    pub fn close(&self) {
        for pool in self.pools.values() {
            pool.close();
        }
    }

    async fn run(&self, envelope: &Envelope) -> Result<Value, DispatchError> {
        let request = Request::decode(envelope)?;
        let pool = self
            .pools
            .get(envelope.subject.as_str())
            .ok_or_else(|| DecodeError::UnknownSubject(envelope.subject.clone()))?;
        let _permit = pool
            .acquire()
            .await
            .map_err(|_| DispatchError::PoolClosed(envelope.subject.clone()))?;
        self.handle(request).await
    }

    async fn handle(&self, request: Request) -> Result<Value, DispatchError> {
        match request {
            Request::CreateAccount(CreateAccountRequest {
                user_id,
                currency,
                name,
            }) => {
                let info = self
                    .accounts
                    .create_user_account(user_id, &currency, &name)
                    .await?;
                Ok(account_json(&info))
            }
            Request::AppendOperation(input) => {
                let record = self.ledger.append(input).await?;
                Ok(serde_json::to_value(record)?)
            }
            Request::History(req) => {
                let history = self.ledger.get_account_history(req.account_id).await?;
                Ok(serde_json::to_value(history)?)
            }
            Request::Transfer(input) => {
                let receipt = self.ledger.transfer(input).await?;
                Ok(serde_json::to_value(receipt)?)
            }
            Request::CreateWithdraw(req) => self.create_withdraw(req).await,
            Request::ProcessWithdraws => {
                let report = self.processor.run_once().await?;
                Ok(report_json(&report))
            }
        }
    }

    async fn create_withdraw(&self, req: CreateWithdrawRequest) -> Result<Value, DispatchError> {
        let target = WithdrawTargetData::decode(req.target_type, &req.target)
            .map_err(|e| DispatchError::Service(e.into()))?;
        let details = self
            .withdraws
            .create_withdraw(CreateWithdrawInput {
                from_account_id: req.from_account_id,
                to_account_id: req.to_account_id,
                amount: req.amount,
                batch_mode: req.batch_mode,
                target,
            })
            .await?;
        Ok(json!({
            "withdraw_id": details.withdraw.id,
            "status": details.status,
            "target_type": req.target_type,
        }))
    }
}

fn account_json(info: &AccountInfo) -> Value {
    json!({
        "account_id": info.account.id,
        "user_id": info.account.user_id,
        "currency": info.account.currency,
        "name": info.account.name,
        "status": info.status,
        "balance": info.balance,
        "total_locked": info.total_locked,
    })
}

fn report_json(report: &ProcessReport) -> Value {
    let errors: Vec<Value> = report
        .groups
        .iter()
        .flat_map(|group| match &group.result {
            Err(e) => vec![json!({
                "target_type": group.target_type,
                "code": e.error_code(),
                "message": e.to_string(),
            })],
            Ok(chains) => chains
                .iter()
                .filter_map(|chain| chain.result.as_ref().err().map(|e| (chain, e)))
                .map(|(chain, e)| {
                    json!({
                        "target_type": group.target_type,
                        "chain": chain.chain,
                        "code": e.error_code(),
                        "message": e.to_string(),
                    })
                })
                .collect(),
        })
        .collect();
    json!({
        "processing": report.processing(),
        "canceled": report.canceled(),
        "errors": errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LoggingGateway;
    use crate::messages::{
        ACCOUNT_CREATE, ACCOUNT_HISTORY, ACCOUNT_OPERATION, WITHDRAW_CREATE, WITHDRAW_PROCESS,
    };
    use custody_core::batch::BatchSettings;
    use custody_db::migration::{Migrator, MigratorTrait};
    use custody_lock::{DistributedLock, LockSettings};
    use sea_orm::Database;

    async fn dispatcher() -> Dispatcher {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let ctx = ServiceContext::new(
            db,
            DistributedLock::in_memory(LockSettings::default()),
            Arc::new(LoggingGateway),
            BatchSettings::default(),
        );
        Dispatcher::new(ctx, &WorkerConfig::default())
    }

    fn envelope(id: &str, subject: &str, payload: Value) -> Envelope {
        Envelope {
            id: Some(id.to_string()),
            subject: subject.to_string(),
            payload,
        }
    }

    async fn create_account(dispatcher: &Dispatcher, user_id: i64) -> i64 {
        let response = dispatcher
            .dispatch(envelope(
                "a",
                ACCOUNT_CREATE,
                json!({"user_id": user_id, "currency": "BTC", "name": "Main"}),
            ))
            .await;
        response.data.unwrap()["account_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_account_flow() {
        let dispatcher = dispatcher().await;
        let account_id = create_account(&dispatcher, 1).await;

        let response = dispatcher
            .dispatch(envelope(
                "b",
                ACCOUNT_OPERATION,
                json!({
                    "account_id": account_id,
                    "synchronous_type": "sync",
                    "operation_type": "deposit",
                    "reference_id": 1,
                    "amount": "2",
                    "lock_amount": "0"
                }),
            ))
            .await;
        assert_eq!(response.id.as_deref(), Some("b"));
        assert!(response.error.is_none(), "{:?}", response.error);

        let response = dispatcher
            .dispatch(envelope("c", ACCOUNT_HISTORY, json!({"account_id": account_id})))
            .await;
        let history = response.data.unwrap();
        assert_eq!(history.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_errors_carry_codes() {
        let dispatcher = dispatcher().await;

        let response = dispatcher
            .dispatch(envelope(
                "x",
                ACCOUNT_OPERATION,
                json!({
                    "account_id": 42,
                    "synchronous_type": "sync",
                    "operation_type": "deposit",
                    "reference_id": 1,
                    "amount": "1",
                    "lock_amount": "0"
                }),
            ))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, "ACCOUNT_NOT_FOUND");
        assert!(!error.retryable);

        let response = dispatcher
            .dispatch(envelope("y", "ledger.purge", Value::Null))
            .await;
        assert_eq!(response.error.unwrap().code, "UNKNOWN_SUBJECT");

        let response = dispatcher
            .dispatch(envelope("z", ACCOUNT_HISTORY, json!({})))
            .await;
        assert_eq!(response.error.unwrap().code, "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_withdraw_flow() {
        let dispatcher = dispatcher().await;
        let from = create_account(&dispatcher, 1).await;
        let to = create_account(&dispatcher, 2).await;

        let response = dispatcher
            .dispatch(envelope(
                "w",
                WITHDRAW_CREATE,
                json!({
                    "from_account_id": from,
                    "to_account_id": to,
                    "amount": "1",
                    "target_type": "onchain",
                    "target": {"chain": "bitcoin", "public_key": "bc1q"}
                }),
            ))
            .await;
        let withdraw_id = response.data.unwrap()["withdraw_id"].as_i64().unwrap();

        let response = dispatcher
            .dispatch(envelope("p", WITHDRAW_PROCESS, Value::Null))
            .await;
        let data = response.data.unwrap();
        assert_eq!(data["processing"], json!([withdraw_id]));
        assert_eq!(data["errors"], json!([]));
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_work() {
        let dispatcher = dispatcher().await;
        dispatcher.close();

        let response = dispatcher
            .dispatch(envelope("q", WITHDRAW_PROCESS, Value::Null))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, "SHUTTING_DOWN");
        assert!(error.retryable);
    }
}
