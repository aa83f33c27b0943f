//! Shared fixtures for the database integration tests.
//!
//! Every test gets its own in-memory SQLite database with the full schema,
//! an in-process lock table and a wallet gateway that records submissions.

#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use custody_core::batch::BatchSettings;
use custody_core::ledger::{OperationInput, OperationRecord, OperationType};
use custody_core::settlement::{GatewayError, SettlementOutput, SettlementReceipt, WalletGateway};
use custody_core::withdraw::{BatchMode, OnchainTarget, WithdrawTargetData};
use custody_db::entities::account_operations;
use custody_db::migration::{Migrator, MigratorTrait};
use custody_db::repositories::{CreateWithdrawInput, WithdrawRepository};
use custody_db::{AccountService, LedgerService, ServiceContext, WithdrawalProcessor};
use custody_lock::{DistributedLock, LockSettings};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection, EntityTrait, PaginatorTrait};

/// Gateway that records every submission and can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    submissions: Mutex<Vec<(String, Vec<SettlementOutput>)>>,
    failing: AtomicBool,
    sequence: AtomicU64,
}

impl RecordingGateway {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<(String, Vec<SettlementOutput>)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletGateway for RecordingGateway {
    async fn submit(
        &self,
        chain: &str,
        outputs: &[SettlementOutput],
    ) -> Result<SettlementReceipt, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("test gateway down".to_string()));
        }
        self.submissions
            .lock()
            .unwrap()
            .push((chain.to_string(), outputs.to_vec()));
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SettlementReceipt {
            tx_id: format!("{chain}-tx-{n}"),
        })
    }
}

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub ctx: ServiceContext,
    pub gateway: Arc<RecordingGateway>,
}

impl TestEnv {
    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.ctx.clone())
    }

    pub fn ledger(&self) -> LedgerService {
        LedgerService::new(self.ctx.clone())
    }

    pub fn processor(&self) -> WithdrawalProcessor {
        WithdrawalProcessor::new(self.ctx.clone())
    }

    pub fn withdraws(&self) -> WithdrawRepository {
        WithdrawRepository::new(self.db.clone())
    }
}

pub fn fast_lock_settings() -> LockSettings {
    LockSettings {
        default_ttl: Duration::from_secs(5),
        retries: 200,
        backoff_step: Duration::from_millis(1),
    }
}

pub async fn setup() -> TestEnv {
    setup_with(BatchSettings::default(), fast_lock_settings()).await
}

pub async fn setup_with(batch: BatchSettings, lock: LockSettings) -> TestEnv {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let gateway = Arc::new(RecordingGateway::default());
    let ctx = ServiceContext::new(
        db.clone(),
        DistributedLock::in_memory(lock),
        gateway.clone(),
        batch,
    );
    TestEnv { db, ctx, gateway }
}

/// Opens a `normal` account and returns its id.
pub async fn open_account(env: &TestEnv, user_id: i64, currency: &str) -> i64 {
    env.accounts()
        .create_user_account(user_id, currency, "Main")
        .await
        .expect("open account")
        .account
        .id
}

pub async fn deposit(env: &TestEnv, account_id: i64, amount: Decimal) -> OperationRecord {
    env.ledger()
        .append(OperationInput::sync(
            account_id,
            OperationType::Deposit,
            1,
            amount,
        ))
        .await
        .expect("deposit")
}

pub async fn operation_count(db: &DatabaseConnection) -> u64 {
    account_operations::Entity::find()
        .count(db)
        .await
        .expect("count operations")
}

/// Creates an on-chain withdraw between two fresh accounts' ids.
pub async fn create_onchain_withdraw(
    env: &TestEnv,
    from_account_id: i64,
    to_account_id: i64,
    amount: Decimal,
    chain: &str,
    public_key: &str,
) -> i64 {
    env.withdraws()
        .create_withdraw(CreateWithdrawInput {
            from_account_id,
            to_account_id,
            amount,
            batch_mode: BatchMode::Normal,
            target: WithdrawTargetData::Onchain(OnchainTarget {
                chain: chain.to_string(),
                public_key: public_key.to_string(),
            }),
        })
        .await
        .expect("create withdraw")
        .withdraw
        .id
}
