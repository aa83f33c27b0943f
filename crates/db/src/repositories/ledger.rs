//! Ledger repository: append-only account operations.
//!
//! An append runs entirely inside the caller's transaction:
//! 1. validate the input
//! 2. check account, currency availability and account status
//! 3. fetch the previous operation through the `LastOperationIndex`
//! 4. compute the new running totals
//! 5. validate the computed row with a placeholder id
//! 6. insert, then re-validate the stored row against its real predecessor
//!
//! Any failure leaves nothing behind once the transaction is dropped.
//!
//! Appends are not idempotent. Callers that retry look up an existing row
//! with [`LedgerRepository::find_operation_by_reference`] first.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custody_core::ledger::{
    ChainState, LedgerError, OperationInput, OperationRecord, OperationType, SynchronousType,
    UNALLOCATED_OPERATION_ID, next_record, validate_input, validate_record, verify_chain,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::account::{load_account, load_status, require_available_currency};
use super::error::StoreError;
use crate::entities::{account_operations, sea_orm_active_enums};

/// Source of the "previous operation" of an account.
#[async_trait]
pub trait LastOperationIndex: Send + Sync {
    /// Returns the latest operation of `account_id`, if any.
    async fn last_operation(
        &self,
        txn: &DatabaseTransaction,
        account_id: i64,
    ) -> Result<Option<OperationRecord>, DbErr>;
}

/// Index that reads the latest row from the operations table.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryLastOperation;

#[async_trait]
impl LastOperationIndex for QueryLastOperation {
    async fn last_operation(
        &self,
        txn: &DatabaseTransaction,
        account_id: i64,
    ) -> Result<Option<OperationRecord>, DbErr> {
        latest_before(txn, account_id, None).await
    }
}

/// Latest operation of an account, optionally strictly before `before_id`.
async fn latest_before<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
    before_id: Option<i64>,
) -> Result<Option<OperationRecord>, DbErr> {
    let mut query = account_operations::Entity::find()
        .filter(account_operations::Column::AccountId.eq(account_id));
    if let Some(id) = before_id {
        query = query.filter(account_operations::Column::Id.lt(id));
    }
    Ok(query
        .order_by_desc(account_operations::Column::Id)
        .one(conn)
        .await?
        .map(Into::into))
}

/// Ledger repository.
#[derive(Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    index: Arc<dyn LastOperationIndex>,
}

impl std::fmt::Debug for LedgerRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerRepository").finish_non_exhaustive()
    }
}

impl LedgerRepository {
    /// Creates a ledger repository reading previous operations from the table.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_index(db, Arc::new(QueryLastOperation))
    }

    /// Creates a ledger repository with a custom previous-operation index.
    #[must_use]
    pub fn with_index(db: DatabaseConnection, index: Arc<dyn LastOperationIndex>) -> Self {
        Self { db, index }
    }

    /// Appends one operation inside `txn`.
    ///
    /// The caller must hold the lock of the account's user and commit `txn`.
    ///
    /// # Errors
    ///
    /// Returns a validation, not-found, state or invariant error; nothing is
    /// written that the caller could commit.
    #[tracing::instrument(skip(self, txn, input), fields(account_id = input.account_id, operation_type = %input.operation_type), err)]
    pub async fn append_in(
        &self,
        txn: &DatabaseTransaction,
        input: &OperationInput,
    ) -> Result<OperationRecord, StoreError> {
        validate_input(input)?;

        let account = load_account(txn, input.account_id).await?;
        require_available_currency(txn, &account.currency).await?;
        load_status(txn, account.id)
            .await?
            .ensure_accepts(account.id, input.operation_type)?;

        let previous = self.index.last_operation(txn, account.id).await?;
        let now = Utc::now();

        let proposed = next_record(previous.as_ref(), input, UNALLOCATED_OPERATION_ID, now);
        validate_record(&proposed)?;

        let stored: OperationRecord = account_operations::ActiveModel {
            account_id: Set(proposed.account_id),
            synchronous_type: Set(proposed.synchronous_type.into()),
            operation_type: Set(proposed.operation_type.into()),
            reference_id: Set(proposed.reference_id),
            timestamp: Set(now.into()),
            amount: Set(proposed.amount),
            balance: Set(proposed.balance),
            lock_amount: Set(proposed.lock_amount),
            total_locked: Set(proposed.total_locked),
            ..Default::default()
        }
        .insert(txn)
        .await?
        .into();

        validate_record(&stored)?;
        let predecessor = latest_before(txn, stored.account_id, Some(stored.id)).await?;
        let expected = ChainState::after(predecessor.as_ref()).apply(stored.amount, stored.lock_amount);
        if expected.balance != stored.balance || expected.total_locked != stored.total_locked {
            tracing::error!(
                operation_id = stored.id,
                expected_balance = %expected.balance,
                stored_balance = %stored.balance,
                "stored operation does not chain on its predecessor"
            );
            return Err(LedgerError::ChainBroken {
                operation_id: stored.id,
            }
            .into());
        }

        tracing::debug!(operation_id = stored.id, balance = %stored.balance, "operation appended");
        Ok(stored)
    }

    /// Finds an operation by its origin, for retry-safe callers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_operation_by_reference(
        &self,
        account_id: i64,
        synchronous_type: SynchronousType,
        operation_type: OperationType,
        reference_id: i64,
    ) -> Result<Option<OperationRecord>, StoreError> {
        Ok(account_operations::Entity::find()
            .filter(account_operations::Column::AccountId.eq(account_id))
            .filter(
                account_operations::Column::SynchronousType
                    .eq(sea_orm_active_enums::SynchronousType::from(synchronous_type)),
            )
            .filter(
                account_operations::Column::OperationType
                    .eq(sea_orm_active_enums::OperationType::from(operation_type)),
            )
            .filter(account_operations::Column::ReferenceId.eq(reference_id))
            .order_by_desc(account_operations::Column::Id)
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    /// Full history of an account, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountId` for id 0, or a database error.
    pub async fn get_account_history(
        &self,
        account_id: i64,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        if account_id <= 0 {
            return Err(LedgerError::InvalidAccountId.into());
        }
        Ok(account_operations::Entity::find()
            .filter(account_operations::Column::AccountId.eq(account_id))
            .order_by_asc(account_operations::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// History of an account with timestamps in `[from, to]`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountId` for id 0, or a database error.
    pub async fn get_account_history_range(
        &self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        if account_id <= 0 {
            return Err(LedgerError::InvalidAccountId.into());
        }
        Ok(account_operations::Entity::find()
            .filter(account_operations::Column::AccountId.eq(account_id))
            .filter(account_operations::Column::Timestamp.gte(from))
            .filter(account_operations::Column::Timestamp.lte(to))
            .order_by_asc(account_operations::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Re-verifies the stored chain of an account.
    ///
    /// # Errors
    ///
    /// Returns `ChainBroken` or the invariant violated by the first bad row.
    pub async fn verify_account_chain(&self, account_id: i64) -> Result<ChainState, StoreError> {
        let history = self.get_account_history(account_id).await?;
        Ok(verify_chain(&history)?)
    }
}
