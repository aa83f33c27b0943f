//! Batch repository: open batch lookup, creation and withdraw attachment.
//!
//! A batch is open while its latest status is `created`. Callers that may
//! race on the same network hold the network's batch lock around
//! [`BatchRepository::find_or_create_batch_in`]; the store itself does not
//! serialize creation.

use chrono::Utc;
use custody_core::batch::{
    BatchError, BatchInfoData, BatchSettings, BatchStatus, ensure_transition, validate_network,
};
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::error::StoreError;
use crate::entities::{batch_infos, batch_withdraws, batches, sea_orm_active_enums};

/// Batch repository.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    db: DatabaseConnection,
}

/// Status rows of a batch, oldest first.
async fn info_history<C: ConnectionTrait>(
    conn: &C,
    batch_id: i64,
) -> Result<Vec<batch_infos::Model>, StoreError> {
    Ok(batch_infos::Entity::find()
        .filter(batch_infos::Column::BatchId.eq(batch_id))
        .order_by_asc(batch_infos::Column::Id)
        .all(conn)
        .await?)
}

async fn latest_status<C: ConnectionTrait>(
    conn: &C,
    batch_id: i64,
) -> Result<BatchStatus, StoreError> {
    let latest = batch_infos::Entity::find()
        .filter(batch_infos::Column::BatchId.eq(batch_id))
        .order_by_desc(batch_infos::Column::Id)
        .one(conn)
        .await?
        .ok_or(BatchError::EmptyHistory(batch_id))?;
    Ok(latest.status.into())
}

async fn insert_info<C: ConnectionTrait>(
    conn: &C,
    batch_id: i64,
    status: BatchStatus,
    data: &BatchInfoData,
) -> Result<batch_infos::Model, StoreError> {
    Ok(batch_infos::ActiveModel {
        batch_id: Set(batch_id),
        status: Set(status.into()),
        info_type: Set(data.info_type().into()),
        data: Set(data.to_json()),
        timestamp: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await?)
}

impl BatchRepository {
    /// Creates a new batch repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Most recently created batch of `network` whose latest status is `created`.
    ///
    /// One query: each batch is joined to its newest status row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNetwork` for an empty name, or a database error.
    pub async fn find_open_batch_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        network: &str,
    ) -> Result<Option<batches::Model>, StoreError> {
        validate_network(network)?;
        let newest = Alias::new("newest");
        let newest_info = Query::select()
            .expr(Expr::col((newest.clone(), batch_infos::Column::Id)).max())
            .from_as(batch_infos::Entity, newest.clone())
            .and_where(
                Expr::col((newest, batch_infos::Column::BatchId))
                    .equals((batches::Entity, batches::Column::Id)),
            )
            .to_owned();

        Ok(batches::Entity::find()
            .inner_join(batch_infos::Entity)
            .filter(batches::Column::Network.eq(network))
            .filter(batch_infos::Column::Status.eq(sea_orm_active_enums::BatchStatus::Created))
            .filter(Expr::col((batch_infos::Entity, batch_infos::Column::Id)).in_subquery(newest_info))
            .order_by_desc(batches::Column::Id)
            .one(conn)
            .await?)
    }

    /// Inserts a batch and its `created` status row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNetwork` for an empty name, or a database error.
    pub async fn create_batch_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        network: &str,
        settings: &BatchSettings,
    ) -> Result<batches::Model, StoreError> {
        validate_network(network)?;
        let now = Utc::now();
        let batch = batches::ActiveModel {
            network: Set(network.to_string()),
            timestamp: Set(now.into()),
            execute_after: Set(settings.deadline_from(now).into()),
            capacity: Set(i32::try_from(settings.capacity).unwrap_or(i32::MAX)),
            data: Set(serde_json::json!({})),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        insert_info(conn, batch.id, BatchStatus::Created, &BatchInfoData::None).await?;

        tracing::info!(batch_id = batch.id, network, capacity = settings.capacity, "batch created");
        Ok(batch)
    }

    /// Returns the open batch of `network`, creating one if none is open.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNetwork` for an empty name, or a database error.
    pub async fn find_or_create_batch_in(
        &self,
        txn: &DatabaseTransaction,
        network: &str,
        settings: &BatchSettings,
    ) -> Result<batches::Model, StoreError> {
        if let Some(batch) = self.find_open_batch_in(txn, network).await? {
            return Ok(batch);
        }
        self.create_batch_in(txn, network, settings).await
    }

    /// Returns the open batch of `network` in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNetwork` for an empty name, or a database error.
    pub async fn find_or_create_batch(
        &self,
        network: &str,
        settings: &BatchSettings,
    ) -> Result<batches::Model, StoreError> {
        let txn = self.db.begin().await?;
        let batch = self.find_or_create_batch_in(&txn, network, settings).await?;
        txn.commit().await?;
        Ok(batch)
    }

    /// Most recently created open batch of `network`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNetwork` for an empty name, or a database error.
    pub async fn find_open_batch(&self, network: &str) -> Result<Option<batches::Model>, StoreError> {
        self.find_open_batch_in(&self.db, network).await
    }

    /// Creates a batch in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNetwork` for an empty name, or a database error.
    pub async fn create_batch(
        &self,
        network: &str,
        settings: &BatchSettings,
    ) -> Result<batches::Model, StoreError> {
        let txn = self.db.begin().await?;
        let batch = self.create_batch_in(&txn, network, settings).await?;
        txn.commit().await?;
        Ok(batch)
    }

    /// Attaches withdraws to a batch. Any failure aborts the whole call.
    ///
    /// # Errors
    ///
    /// Returns a database error, e.g. when a withdraw already belongs to a batch.
    pub async fn add_withdraws_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        batch_id: i64,
        withdraw_ids: &[i64],
    ) -> Result<(), StoreError> {
        if batch_id <= 0 {
            return Err(BatchError::InvalidBatchId.into());
        }
        if withdraw_ids.is_empty() {
            return Ok(());
        }
        let rows = withdraw_ids.iter().map(|&withdraw_id| batch_withdraws::ActiveModel {
            batch_id: Set(batch_id),
            withdraw_id: Set(withdraw_id),
        });
        batch_withdraws::Entity::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
        tracing::debug!(batch_id, count = withdraw_ids.len(), "withdraws attached to batch");
        Ok(())
    }

    /// Number of withdraws attached to a batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_withdraws_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        batch_id: i64,
    ) -> Result<u64, StoreError> {
        Ok(batch_withdraws::Entity::find()
            .filter(batch_withdraws::Column::BatchId.eq(batch_id))
            .count(conn)
            .await?)
    }

    /// Ids of the withdraws attached to a batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn batch_withdraws(&self, batch_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(batch_withdraws::Entity::find()
            .filter(batch_withdraws::Column::BatchId.eq(batch_id))
            .order_by_asc(batch_withdraws::Column::WithdrawId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.withdraw_id)
            .collect())
    }

    /// Batch a withdraw is attached to, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn batch_of_withdraw(&self, withdraw_id: i64) -> Result<Option<i64>, StoreError> {
        Ok(batch_withdraws::Entity::find()
            .filter(batch_withdraws::Column::WithdrawId.eq(withdraw_id))
            .one(&self.db)
            .await?
            .map(|row| row.batch_id))
    }

    /// Gets a batch by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the batch does not exist.
    pub async fn get_batch(&self, batch_id: i64) -> Result<batches::Model, StoreError> {
        if batch_id <= 0 {
            return Err(BatchError::InvalidBatchId.into());
        }
        batches::Entity::find_by_id(batch_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| BatchError::NotFound(batch_id).into())
    }

    /// Status rows of a batch with decoded payloads, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PayloadDecode` for a payload that does not match its tag.
    pub async fn batch_history(
        &self,
        batch_id: i64,
    ) -> Result<Vec<(BatchStatus, BatchInfoData)>, StoreError> {
        info_history(&self.db, batch_id)
            .await?
            .into_iter()
            .map(|info| -> Result<(BatchStatus, BatchInfoData), StoreError> {
                let data = BatchInfoData::decode(info.info_type.into(), &info.data)?;
                Ok((info.status.into(), data))
            })
            .collect()
    }

    /// Current status of a batch.
    ///
    /// # Errors
    ///
    /// Returns `EmptyHistory` for a batch without status rows.
    pub async fn current_batch_status(&self, batch_id: i64) -> Result<BatchStatus, StoreError> {
        latest_status(&self.db, batch_id).await
    }

    /// Appends a status inside `conn` after checking the batch state machine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` for an illegal change.
    pub async fn append_batch_status_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        batch_id: i64,
        status: BatchStatus,
        data: &BatchInfoData,
    ) -> Result<batch_infos::Model, StoreError> {
        let current = latest_status(conn, batch_id).await?;
        ensure_transition(current, status)?;
        let info = insert_info(conn, batch_id, status, data).await?;
        tracing::info!(batch_id, from = %current, to = %status, "batch status changed");
        Ok(info)
    }

    /// Appends a status in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` for an illegal change.
    pub async fn append_batch_status(
        &self,
        batch_id: i64,
        status: BatchStatus,
        data: &BatchInfoData,
    ) -> Result<batch_infos::Model, StoreError> {
        let txn = self.db.begin().await?;
        let info = self
            .append_batch_status_in(&txn, batch_id, status, data)
            .await?;
        txn.commit().await?;
        Ok(info)
    }
}
