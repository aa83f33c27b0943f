//! Account repository and account state guard.
//!
//! An account's identity is written once. Its status lives in a separate
//! single-row table and is the gate every ledger append consults.

use chrono::Utc;
use custody_core::account::{AccountRuleError, AccountStatus, validate_new_account};
use custody_core::ledger::{ChainState, LedgerError, OperationRecord};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::error::StoreError;
use crate::entities::{account_operations, account_states, accounts, currencies};

/// Account with its status and latest totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// The account record.
    pub account: accounts::Model,
    /// Current status.
    pub status: AccountStatus,
    /// Balance after the latest operation.
    pub balance: Decimal,
    /// Locked funds after the latest operation.
    pub total_locked: Decimal,
}

/// Loads an account or fails with `AccountNotFound`.
pub(crate) async fn load_account<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
) -> Result<accounts::Model, StoreError> {
    accounts::Entity::find_by_id(account_id)
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(account_id).into())
}

/// Loads the status of an account or fails with `AccountStateNotFound`.
pub(crate) async fn load_status<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
) -> Result<AccountStatus, StoreError> {
    let state = account_states::Entity::find()
        .filter(account_states::Column::AccountId.eq(account_id))
        .one(conn)
        .await?
        .ok_or(LedgerError::AccountStateNotFound(account_id))?;
    Ok(state.status.into())
}

/// Fails unless the currency exists and is available.
pub(crate) async fn require_available_currency<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<(), StoreError> {
    let currency = currencies::Entity::find_by_id(name.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::CurrencyNotFound(name.to_string()))?;
    if !currency.available {
        return Err(LedgerError::CurrencyNotAvailable(name.to_string()).into());
    }
    Ok(())
}

/// Read-only checks of currency availability and account status.
#[derive(Debug, Clone)]
pub struct AccountStateGuard {
    db: DatabaseConnection,
}

impl AccountStateGuard {
    /// Creates a new guard.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the current status of an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountStateNotFound` if the account has no state row.
    pub async fn get_account_status(&self, account_id: i64) -> Result<AccountStatus, StoreError> {
        load_status(&self.db, account_id).await
    }

    /// Returns whether a currency accepts new activity.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyNotFound` for an unknown currency.
    pub async fn is_currency_available(&self, name: &str) -> Result<bool, StoreError> {
        let currency = currencies::Entity::find_by_id(name.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::CurrencyNotFound(name.to_string()))?;
        Ok(currency.available)
    }
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts an account and its `created` state row.
    ///
    /// The caller activates the account once its `init` operation exists.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid identity, an unknown or unavailable
    /// currency, or a database failure.
    #[tracing::instrument(skip(self, txn), err)]
    pub async fn insert_account_in(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
        currency: &str,
        name: &str,
    ) -> Result<accounts::Model, StoreError> {
        validate_new_account(user_id, name)?;
        require_available_currency(txn, currency).await?;

        let now = Utc::now();
        let account = accounts::ActiveModel {
            user_id: Set(user_id),
            currency: Set(currency.to_string()),
            name: Set(name.trim().to_string()),
            created_at: Set(now.into()),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        account_states::ActiveModel {
            account_id: Set(account.id),
            status: Set(AccountStatus::Created.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        Ok(account)
    }

    /// Changes the status of an account. Returns the previous status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` when re-entering `created`, or
    /// `AccountStateNotFound` if the account has no state row.
    pub async fn set_status_in(
        &self,
        txn: &DatabaseTransaction,
        account_id: i64,
        status: AccountStatus,
    ) -> Result<AccountStatus, StoreError> {
        let state = account_states::Entity::find()
            .filter(account_states::Column::AccountId.eq(account_id))
            .one(txn)
            .await?
            .ok_or(LedgerError::AccountStateNotFound(account_id))?;

        let previous: AccountStatus = state.status.into();
        if !previous.can_transition_to(status) {
            return Err(AccountRuleError::InvalidStatusTransition {
                from: previous,
                to: status,
            }
            .into());
        }

        let mut active: account_states::ActiveModel = state.into();
        active.status = Set(status.into());
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await?;

        tracing::info!(account_id, from = %previous, to = %status, "account status changed");
        Ok(previous)
    }

    /// Gets an account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn get_account(&self, account_id: i64) -> Result<accounts::Model, StoreError> {
        load_account(&self.db, account_id).await
    }

    /// Gets an account with its status and latest totals.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or `AccountStateNotFound`.
    pub async fn get_account_info(&self, account_id: i64) -> Result<AccountInfo, StoreError> {
        let account = load_account(&self.db, account_id).await?;
        let status = load_status(&self.db, account_id).await?;

        let latest: Option<OperationRecord> = account_operations::Entity::find()
            .filter(account_operations::Column::AccountId.eq(account_id))
            .order_by_desc(account_operations::Column::Id)
            .one(&self.db)
            .await?
            .map(Into::into);
        let totals = ChainState::after(latest.as_ref());

        Ok(AccountInfo {
            account,
            status,
            balance: totals.balance,
            total_locked: totals.total_locked,
        })
    }

    /// Lists the accounts of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_user_accounts(&self, user_id: i64) -> Result<Vec<accounts::Model>, StoreError> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await?)
    }
}
