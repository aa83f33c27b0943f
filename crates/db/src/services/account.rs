//! Account lifecycle under the user lock.

use custody_core::account::{AccountStatus, validate_new_account};
use custody_core::ledger::{LedgerError, OperationInput};
use custody_lock::LockGuard;
use rust_decimal::Decimal;
use sea_orm::TransactionTrait;

use super::error::ServiceError;
use super::{ServiceContext, release};
use crate::entities::accounts;
use crate::repositories::{AccountInfo, AccountRepository, AccountStateGuard, LedgerRepository};

/// Opens accounts and changes their status.
#[derive(Debug, Clone)]
pub struct AccountService {
    ctx: ServiceContext,
    accounts: AccountRepository,
    ledger: LedgerRepository,
    guard: AccountStateGuard,
}

impl AccountService {
    /// Creates the service.
    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            accounts: AccountRepository::new(ctx.db.clone()),
            ledger: LedgerRepository::new(ctx.db.clone()),
            guard: AccountStateGuard::new(ctx.db.clone()),
            ctx,
        }
    }

    /// Opens an account: identity, `init` operation and `normal` status in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `CurrencyNotFound`/`CurrencyNotAvailable`,
    /// a lock error, or a database error.
    #[tracing::instrument(skip(self), err)]
    pub async fn create_user_account(
        &self,
        user_id: i64,
        currency: &str,
        name: &str,
    ) -> Result<AccountInfo, ServiceError> {
        validate_new_account(user_id, name)?;
        if !self.guard.is_currency_available(currency).await? {
            return Err(LedgerError::CurrencyNotAvailable(currency.to_string()).into());
        }

        let lock = self.ctx.lock.lock_user(user_id).await?;
        let result = self.open_locked(&lock, user_id, currency, name).await;
        release(lock).await;

        let account = result?;
        tracing::info!(account_id = account.id, user_id, currency, "account opened");
        Ok(AccountInfo {
            account,
            status: AccountStatus::Normal,
            balance: Decimal::ZERO,
            total_locked: Decimal::ZERO,
        })
    }

    async fn open_locked(
        &self,
        lock: &LockGuard,
        user_id: i64,
        currency: &str,
        name: &str,
    ) -> Result<accounts::Model, ServiceError> {
        let txn = self.ctx.db.begin().await?;
        let account = self
            .accounts
            .insert_account_in(&txn, user_id, currency, name)
            .await?;
        self.ledger
            .append_in(&txn, &OperationInput::init(account.id))
            .await?;
        self.accounts
            .set_status_in(&txn, account.id, AccountStatus::Normal)
            .await?;
        lock.ensure_held().await?;
        txn.commit().await?;
        Ok(account)
    }

    /// Changes the status of an account. Returns the previous status.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `InvalidStatusTransition`, a lock error,
    /// or a database error.
    #[tracing::instrument(skip(self), err)]
    pub async fn set_account_status(
        &self,
        account_id: i64,
        status: AccountStatus,
    ) -> Result<AccountStatus, ServiceError> {
        let account = self.accounts.get_account(account_id).await?;

        let lock = self.ctx.lock.lock_user(account.user_id).await?;
        let result = async {
            let txn = self.ctx.db.begin().await?;
            let previous = self.accounts.set_status_in(&txn, account_id, status).await?;
            lock.ensure_held().await?;
            txn.commit().await?;
            Ok::<_, ServiceError>(previous)
        }
        .await;
        release(lock).await;
        result
    }

    /// Gets an account with its status and latest totals.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or `AccountStateNotFound`.
    pub async fn get_account_info(&self, account_id: i64) -> Result<AccountInfo, ServiceError> {
        Ok(self.accounts.get_account_info(account_id).await?)
    }

    /// Lists the accounts of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_user_accounts(&self, user_id: i64) -> Result<Vec<accounts::Model>, ServiceError> {
        Ok(self.accounts.list_user_accounts(user_id).await?)
    }
}
