//! Withdraw repository.
//!
//! A withdraw is written once together with its destination, its zero fee
//! row and a `created` status. Every later status is appended to its history;
//! the current status is the latest history row.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use custody_core::withdraw::{
    BatchMode, WithdrawError, WithdrawStatus, WithdrawTargetData, ensure_transition,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use super::account::load_account;
use super::error::StoreError;
use crate::entities::{fees, sea_orm_active_enums, withdraw_infos, withdraw_targets, withdraws};

/// Input for creating a withdraw.
#[derive(Debug, Clone)]
pub struct CreateWithdrawInput {
    /// Account the funds leave.
    pub from_account_id: i64,
    /// Account credited on settlement.
    pub to_account_id: i64,
    /// Amount to send.
    pub amount: Decimal,
    /// Requested urgency.
    pub batch_mode: BatchMode,
    /// Destination.
    pub target: WithdrawTargetData,
}

/// A withdraw with its destination and current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawDetails {
    /// The withdraw record.
    pub withdraw: withdraws::Model,
    /// The destination record.
    pub target: withdraw_targets::Model,
    /// Current status.
    pub status: WithdrawStatus,
}

/// Status history of a withdraw, oldest first.
pub(crate) async fn status_history<C: ConnectionTrait>(
    conn: &C,
    withdraw_id: i64,
) -> Result<Vec<WithdrawStatus>, StoreError> {
    Ok(withdraw_infos::Entity::find()
        .filter(withdraw_infos::Column::WithdrawId.eq(withdraw_id))
        .order_by_asc(withdraw_infos::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|info| info.status.into())
        .collect())
}

/// Appends `status` to a withdraw's history after checking the transition.
pub(crate) async fn append_status<C: ConnectionTrait>(
    conn: &C,
    withdraw_id: i64,
    status: WithdrawStatus,
) -> Result<withdraw_infos::Model, StoreError> {
    let current = status_history(conn, withdraw_id)
        .await?
        .last()
        .copied()
        .ok_or(WithdrawError::EmptyHistory(withdraw_id))?;
    ensure_transition(current, status)?;

    let info = withdraw_infos::ActiveModel {
        withdraw_id: Set(withdraw_id),
        status: Set(status.into()),
        timestamp: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    tracing::info!(withdraw_id, from = %current, to = %status, "withdraw status changed");
    Ok(info)
}

/// Withdraw repository.
#[derive(Debug, Clone)]
pub struct WithdrawRepository {
    db: DatabaseConnection,
}

impl WithdrawRepository {
    /// Creates a new withdraw repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a withdraw with its target, a zero fee and a `created` status.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero ids or a non-positive amount,
    /// `AccountNotFound` for unknown accounts, or a database error.
    #[tracing::instrument(skip(self, input), fields(from = input.from_account_id, amount = %input.amount), err)]
    pub async fn create_withdraw(
        &self,
        input: CreateWithdrawInput,
    ) -> Result<WithdrawDetails, StoreError> {
        if input.from_account_id <= 0 || input.to_account_id <= 0 {
            return Err(WithdrawError::InvalidAccountId.into());
        }
        if input.amount <= Decimal::ZERO {
            return Err(WithdrawError::NonPositiveAmount.into());
        }
        let data = input.target.to_json()?;

        let txn = self.db.begin().await?;

        load_account(&txn, input.from_account_id).await?;
        load_account(&txn, input.to_account_id).await?;

        let now = Utc::now();
        let withdraw = withdraws::ActiveModel {
            from_account_id: Set(input.from_account_id),
            to_account_id: Set(input.to_account_id),
            amount: Set(input.amount),
            batch_mode: Set(input.batch_mode.into()),
            created_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let target = withdraw_targets::ActiveModel {
            withdraw_id: Set(withdraw.id),
            target_type: Set(input.target.target_type().into()),
            data: Set(data),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        fees::ActiveModel {
            withdraw_id: Set(withdraw.id),
            amount: Set(Decimal::ZERO),
            data: Set(serde_json::json!({})),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        withdraw_infos::ActiveModel {
            withdraw_id: Set(withdraw.id),
            status: Set(WithdrawStatus::Created.into()),
            timestamp: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(withdraw_id = withdraw.id, target_type = %input.target.target_type(), "withdraw created");
        Ok(WithdrawDetails {
            withdraw,
            target,
            status: WithdrawStatus::Created,
        })
    }

    /// Returns the targets of every withdraw whose latest status is `created`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn fetch_created_withdraws(&self) -> Result<Vec<withdraw_targets::Model>, StoreError> {
        let candidates: HashSet<i64> = withdraw_infos::Entity::find()
            .filter(withdraw_infos::Column::Status.eq(sea_orm_active_enums::WithdrawStatus::Created))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|info| info.withdraw_id)
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Latest status per candidate; rows are ordered so the last write wins
        let mut latest: HashMap<i64, sea_orm_active_enums::WithdrawStatus> = HashMap::new();
        for info in withdraw_infos::Entity::find()
            .filter(withdraw_infos::Column::WithdrawId.is_in(candidates.iter().copied()))
            .order_by_asc(withdraw_infos::Column::Id)
            .all(&self.db)
            .await?
        {
            latest.insert(info.withdraw_id, info.status);
        }

        let pending: Vec<i64> = latest
            .into_iter()
            .filter(|(_, status)| *status == sea_orm_active_enums::WithdrawStatus::Created)
            .map(|(id, _)| id)
            .collect();

        Ok(withdraw_targets::Entity::find()
            .filter(withdraw_targets::Column::WithdrawId.is_in(pending))
            .order_by_asc(withdraw_targets::Column::WithdrawId)
            .all(&self.db)
            .await?)
    }

    /// Gets a withdraw by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the withdraw does not exist.
    pub async fn get_withdraw(&self, withdraw_id: i64) -> Result<withdraws::Model, StoreError> {
        load_withdraw(&self.db, withdraw_id).await
    }

    /// Gets a withdraw with its destination and current status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `EmptyHistory`.
    pub async fn get_withdraw_details(&self, withdraw_id: i64) -> Result<WithdrawDetails, StoreError> {
        let withdraw = load_withdraw(&self.db, withdraw_id).await?;
        let target = withdraw_targets::Entity::find()
            .filter(withdraw_targets::Column::WithdrawId.eq(withdraw_id))
            .one(&self.db)
            .await?
            .ok_or(WithdrawError::NotFound(withdraw_id))?;
        let status = self.current_withdraw_status(withdraw_id).await?;
        Ok(WithdrawDetails {
            withdraw,
            target,
            status,
        })
    }

    /// Status history rows of a withdraw, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn withdraw_history(
        &self,
        withdraw_id: i64,
    ) -> Result<Vec<withdraw_infos::Model>, StoreError> {
        if withdraw_id <= 0 {
            return Err(WithdrawError::InvalidWithdrawId.into());
        }
        Ok(withdraw_infos::Entity::find()
            .filter(withdraw_infos::Column::WithdrawId.eq(withdraw_id))
            .order_by_asc(withdraw_infos::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Current status of a withdraw.
    ///
    /// # Errors
    ///
    /// Returns `EmptyHistory` for a withdraw without status rows.
    pub async fn current_withdraw_status(
        &self,
        withdraw_id: i64,
    ) -> Result<WithdrawStatus, StoreError> {
        status_history(&self.db, withdraw_id)
            .await?
            .last()
            .copied()
            .ok_or_else(|| WithdrawError::EmptyHistory(withdraw_id).into())
    }

    /// Appends a status after checking the withdraw state machine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` for an illegal change.
    pub async fn append_withdraw_status(
        &self,
        withdraw_id: i64,
        status: WithdrawStatus,
    ) -> Result<withdraw_infos::Model, StoreError> {
        let txn = self.db.begin().await?;
        let info = append_status(&txn, withdraw_id, status).await?;
        txn.commit().await?;
        Ok(info)
    }

    /// Cancels a withdraw that is `created` or `canceling`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` from any other status.
    pub async fn cancel_withdraw(&self, withdraw_id: i64) -> Result<withdraw_infos::Model, StoreError> {
        load_withdraw(&self.db, withdraw_id).await?;
        self.append_withdraw_status(withdraw_id, WithdrawStatus::Canceled)
            .await
    }
}

/// Loads a withdraw or fails with `NotFound`.
pub(crate) async fn load_withdraw<C: ConnectionTrait>(
    conn: &C,
    withdraw_id: i64,
) -> Result<withdraws::Model, StoreError> {
    if withdraw_id <= 0 {
        return Err(WithdrawError::InvalidWithdrawId.into());
    }
    withdraws::Entity::find_by_id(withdraw_id)
        .one(conn)
        .await?
        .ok_or_else(|| WithdrawError::NotFound(withdraw_id).into())
}
