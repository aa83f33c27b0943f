//! Ledger appends and transfers under the user lock.

use chrono::{DateTime, Utc};
use custody_core::ledger::{LedgerError, OperationInput, OperationRecord, OperationType, validate_input};
use custody_lock::LockGuard;
use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use super::error::ServiceError;
use super::{ServiceContext, release};
use crate::repositories::{AccountRepository, LedgerRepository};

/// Movement of funds between two accounts of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInput {
    /// Debited account.
    pub source_account_id: i64,
    /// Credited account.
    pub destination_account_id: i64,
    /// Positive amount to move.
    pub amount: Decimal,
    /// Originating entity id, stored on both rows.
    pub reference_id: i64,
}

/// The two rows written by a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Row on the source account.
    pub debit: OperationRecord,
    /// Row on the destination account.
    pub credit: OperationRecord,
}

/// Appends operations to account chains.
#[derive(Debug, Clone)]
pub struct LedgerService {
    ctx: ServiceContext,
    accounts: AccountRepository,
    ledger: LedgerRepository,
}

impl LedgerService {
    /// Creates the service.
    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        let ledger = LedgerRepository::new(ctx.db.clone());
        Self::with_repository(ctx, ledger)
    }

    /// Creates the service over a specific ledger repository.
    #[must_use]
    pub fn with_repository(ctx: ServiceContext, ledger: LedgerRepository) -> Self {
        Self {
            accounts: AccountRepository::new(ctx.db.clone()),
            ledger,
            ctx,
        }
    }

    /// The underlying ledger repository.
    #[must_use]
    pub const fn repository(&self) -> &LedgerRepository {
        &self.ledger
    }

    /// Appends one operation while holding the lock of the account's user.
    ///
    /// # Errors
    ///
    /// Returns a validation, not-found, state or invariant error, a lock
    /// error, or a database error. Nothing is committed on error.
    pub async fn append(&self, input: OperationInput) -> Result<OperationRecord, ServiceError> {
        validate_input(&input)?;
        let account = self.accounts.get_account(input.account_id).await?;

        let lock = self.ctx.lock.lock_user(account.user_id).await?;
        let result = self.append_locked(&lock, &input).await;
        release(lock).await;
        result
    }

    async fn append_locked(
        &self,
        lock: &LockGuard,
        input: &OperationInput,
    ) -> Result<OperationRecord, ServiceError> {
        let txn = self.ctx.db.begin().await?;
        let record = self.ledger.append_in(&txn, input).await?;
        lock.ensure_held().await?;
        txn.commit().await?;
        Ok(record)
    }

    /// Moves funds between two accounts of one currency in one transaction.
    ///
    /// Both users are locked in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveTransfer`, `SameAccountTransfer`,
    /// `CurrencyMismatch`, or any error of the two appends.
    #[tracing::instrument(skip(self), err)]
    pub async fn transfer(&self, input: TransferInput) -> Result<TransferReceipt, ServiceError> {
        if input.source_account_id <= 0 || input.destination_account_id <= 0 {
            return Err(LedgerError::InvalidAccountId.into());
        }
        if input.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveTransfer.into());
        }
        if input.source_account_id == input.destination_account_id {
            return Err(LedgerError::SameAccountTransfer(input.source_account_id).into());
        }

        let source = self.accounts.get_account(input.source_account_id).await?;
        let destination = self
            .accounts
            .get_account(input.destination_account_id)
            .await?;
        if source.currency != destination.currency {
            return Err(LedgerError::CurrencyMismatch {
                source_currency: source.currency,
                destination_currency: destination.currency,
            }
            .into());
        }

        let mut users = vec![source.user_id, destination.user_id];
        users.sort_unstable();
        users.dedup();

        let mut locks = Vec::with_capacity(users.len());
        for user_id in users {
            match self.ctx.lock.lock_user(user_id).await {
                Ok(lock) => locks.push(lock),
                Err(e) => {
                    for lock in locks {
                        release(lock).await;
                    }
                    return Err(e.into());
                }
            }
        }

        let result = self.transfer_locked(&locks, &input).await;
        for lock in locks {
            release(lock).await;
        }
        result
    }

    async fn transfer_locked(
        &self,
        locks: &[LockGuard],
        input: &TransferInput,
    ) -> Result<TransferReceipt, ServiceError> {
        let debit = OperationInput::sync(
            input.source_account_id,
            OperationType::Transfer,
            input.reference_id,
            -input.amount,
        );
        let credit = OperationInput::sync(
            input.destination_account_id,
            OperationType::Transfer,
            input.reference_id,
            input.amount,
        );

        let txn = self.ctx.db.begin().await?;
        let debit = self.ledger.append_in(&txn, &debit).await?;
        let credit = self.ledger.append_in(&txn, &credit).await?;
        for lock in locks {
            lock.ensure_held().await?;
        }
        txn.commit().await?;

        tracing::info!(
            debit_id = debit.id,
            credit_id = credit.id,
            amount = %input.amount,
            "transfer committed"
        );
        Ok(TransferReceipt { debit, credit })
    }

    /// Full history of an account, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountId` for id 0, or a database error.
    pub async fn get_account_history(
        &self,
        account_id: i64,
    ) -> Result<Vec<OperationRecord>, ServiceError> {
        Ok(self.ledger.get_account_history(account_id).await?)
    }

    /// History of an account within `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountId` for id 0, or a database error.
    pub async fn get_account_history_range(
        &self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OperationRecord>, ServiceError> {
        Ok(self
            .ledger
            .get_account_history_range(account_id, from, to)
            .await?)
    }
}
