//! Withdraw processing: grouping, validation and batch assembly.
//!
//! One pass takes the targets of `created` withdraws, groups them by target
//! type and, for on-chain targets, by chain. Each chain is assembled under
//! that chain's batch lock:
//!
//! 1. items with an empty public key or a non-positive amount are set aside
//! 2. the open batch is found or created and filled up to its capacity
//! 3. accepted withdraws move to `processing` and join the batch
//! 4. the wallet gateway receives the accepted outputs in one submission
//! 5. the batch moves to `processing` with the gateway's transaction id
//!
//! Steps 2 to 5 share one transaction. Set-aside items are canceled after it
//! ends, whatever its outcome, while the lock is still held. Valid items that
//! do not fit stay `created` for the next pass.

use std::collections::BTreeMap;

use custody_core::batch::{BatchError, BatchInfoData, BatchStatus, CryptoInfo, remaining_capacity};
use custody_core::settlement::SettlementOutput;
use custody_core::withdraw::{
    RejectReason, WithdrawError, WithdrawStatus, WithdrawTargetData, WithdrawTargetType,
    check_onchain_item, is_unprocessed,
};
use custody_lock::LockGuard;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};

use super::error::ServiceError;
use super::{ServiceContext, release};
use crate::entities::withdraw_targets;
use crate::repositories::withdraw::{append_status, load_withdraw, status_history};
use crate::repositories::{BatchRepository, WithdrawRepository};

/// Outcome of one batch assembly that committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPass {
    /// Batch the accepted withdraws joined; none when nothing was accepted.
    pub batch_id: Option<i64>,
    /// Withdraws moved to `processing`.
    pub processing: Vec<i64>,
    /// Valid withdraws left `created` because the batch was full.
    pub deferred: Vec<i64>,
    /// Withdraws another pass advanced first.
    pub skipped: Vec<i64>,
    /// Gateway transaction id, when anything was submitted.
    pub tx_id: Option<String>,
}

/// Outcome for one chain.
#[derive(Debug)]
pub struct ChainReport {
    /// Chain name.
    pub chain: String,
    /// Invalid withdraws that were canceled.
    pub canceled: Vec<(i64, RejectReason)>,
    /// Batch assembly result; on error nothing of it was committed.
    pub result: Result<BatchPass, ServiceError>,
}

/// Outcome for one target type.
#[derive(Debug)]
pub struct GroupReport {
    /// Target type of the group.
    pub target_type: WithdrawTargetType,
    /// Withdraws skipped before assembly because they were already advanced.
    pub skipped: Vec<i64>,
    /// Per-chain results, or the error that aborted the whole group.
    pub result: Result<Vec<ChainReport>, ServiceError>,
}

/// Outcome of one processing pass.
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// One entry per target type seen, in order of first appearance.
    pub groups: Vec<GroupReport>,
}

impl ProcessReport {
    /// First error of any group or chain.
    #[must_use]
    pub fn first_error(&self) -> Option<&ServiceError> {
        self.groups.iter().find_map(|group| match &group.result {
            Err(e) => Some(e),
            Ok(chains) => chains.iter().find_map(|chain| chain.result.as_ref().err()),
        })
    }

    /// Ids of every withdraw moved to `processing`.
    #[must_use]
    pub fn processing(&self) -> Vec<i64> {
        self.passes()
            .flat_map(|pass| pass.processing.iter().copied())
            .collect()
    }

    /// Ids of every withdraw canceled as invalid.
    #[must_use]
    pub fn canceled(&self) -> Vec<i64> {
        self.chains()
            .flat_map(|chain| chain.canceled.iter().map(|(id, _)| *id))
            .collect()
    }

    fn chains(&self) -> impl Iterator<Item = &ChainReport> {
        self.groups
            .iter()
            .filter_map(|group| group.result.as_ref().ok())
            .flatten()
    }

    fn passes(&self) -> impl Iterator<Item = &BatchPass> {
        self.chains().filter_map(|chain| chain.result.as_ref().ok())
    }
}

#[derive(Debug, Clone)]
struct OnchainItem {
    withdraw_id: i64,
    public_key: String,
    amount: Decimal,
}

/// Assembles `created` withdraws into batches.
#[derive(Debug, Clone)]
pub struct WithdrawalProcessor {
    ctx: ServiceContext,
    withdraws: WithdrawRepository,
    batches: BatchRepository,
}

impl WithdrawalProcessor {
    /// Creates the processor.
    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            withdraws: WithdrawRepository::new(ctx.db.clone()),
            batches: BatchRepository::new(ctx.db.clone()),
            ctx,
        }
    }

    /// Targets of every withdraw whose latest status is `created`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn fetch_created_withdraws(
        &self,
    ) -> Result<Vec<withdraw_targets::Model>, ServiceError> {
        Ok(self.withdraws.fetch_created_withdraws().await?)
    }

    /// Fetches and processes every `created` withdraw.
    ///
    /// # Errors
    ///
    /// Returns an error only if the fetch fails; per-group failures are in
    /// the report.
    pub async fn run_once(&self) -> Result<ProcessReport, ServiceError> {
        let targets = self.fetch_created_withdraws().await?;
        if targets.is_empty() {
            tracing::debug!("no created withdraws");
            return Ok(ProcessReport::default());
        }
        Ok(self.process_withdraws(targets).await)
    }

    /// Processes the given targets group by group.
    pub async fn process_withdraws(&self, targets: Vec<withdraw_targets::Model>) -> ProcessReport {
        let mut groups: Vec<(WithdrawTargetType, Vec<withdraw_targets::Model>)> = Vec::new();
        for target in targets {
            let target_type: WithdrawTargetType = target.target_type.into();
            match groups.iter_mut().find(|(t, _)| *t == target_type) {
                Some((_, members)) => members.push(target),
                None => groups.push((target_type, vec![target])),
            }
        }

        let mut report = ProcessReport::default();
        for (target_type, members) in groups {
            let group = match target_type {
                WithdrawTargetType::Onchain => self.process_onchain(members).await,
                other => {
                    tracing::warn!(target_type = %other, count = members.len(), "unsupported withdraw target type");
                    GroupReport {
                        target_type: other,
                        skipped: Vec::new(),
                        result: Err(WithdrawError::UnsupportedTargetType(other).into()),
                    }
                }
            };
            if let Err(e) = &group.result {
                tracing::error!(target_type = %group.target_type, error = %e, "withdraw group failed");
            }
            report.groups.push(group);
        }
        report
    }

    async fn process_onchain(&self, members: Vec<withdraw_targets::Model>) -> GroupReport {
        let mut skipped = Vec::new();
        let result = match self.collect_onchain(members, &mut skipped).await {
            Ok(by_chain) => {
                let mut chains = Vec::with_capacity(by_chain.len());
                for (chain, items) in by_chain {
                    chains.push(self.assemble_chain(chain, items).await);
                }
                Ok(chains)
            }
            Err(e) => Err(e),
        };
        GroupReport {
            target_type: WithdrawTargetType::Onchain,
            skipped,
            result,
        }
    }

    async fn collect_onchain(
        &self,
        members: Vec<withdraw_targets::Model>,
        skipped: &mut Vec<i64>,
    ) -> Result<BTreeMap<String, Vec<OnchainItem>>, ServiceError> {
        let mut by_chain: BTreeMap<String, Vec<OnchainItem>> = BTreeMap::new();
        for target in members {
            let withdraw = load_withdraw(&self.ctx.db, target.withdraw_id).await?;
            let history = status_history(&self.ctx.db, withdraw.id).await?;
            if !is_unprocessed(&history) {
                tracing::warn!(withdraw_id = withdraw.id, ?history, "withdraw already advanced, skipping");
                skipped.push(withdraw.id);
                continue;
            }

            let onchain = match WithdrawTargetData::decode(target.target_type.into(), &target.data)? {
                WithdrawTargetData::Onchain(onchain) => onchain,
                other => return Err(WithdrawError::UnsupportedTargetType(other.target_type()).into()),
            };
            by_chain
                .entry(onchain.chain)
                .or_default()
                .push(OnchainItem {
                    withdraw_id: withdraw.id,
                    public_key: onchain.public_key,
                    amount: withdraw.amount,
                });
        }
        Ok(by_chain)
    }

    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    async fn assemble_chain(&self, chain: String, items: Vec<OnchainItem>) -> ChainReport {
        let lock = match self.ctx.lock.lock_batch_network(&chain).await {
            Ok(lock) => lock,
            Err(e) => {
                return ChainReport {
                    chain,
                    canceled: Vec::new(),
                    result: Err(e.into()),
                };
            }
        };

        let mut valid = Vec::with_capacity(items.len());
        let mut rejected = Vec::new();
        for item in items {
            match check_onchain_item(&item.public_key, item.amount) {
                Ok(()) => valid.push(item),
                Err(reason) => {
                    tracing::warn!(withdraw_id = item.withdraw_id, reason = reason.as_str(), "invalid withdraw");
                    rejected.push((item.withdraw_id, reason));
                }
            }
        }

        let result = self.fill_batch(&lock, &chain, valid).await;
        let canceled = self.cancel_rejected(rejected).await;
        release(lock).await;

        ChainReport {
            chain,
            canceled,
            result,
        }
    }

    async fn fill_batch(
        &self,
        lock: &LockGuard,
        chain: &str,
        valid: Vec<OnchainItem>,
    ) -> Result<BatchPass, ServiceError> {
        let txn = self.ctx.db.begin().await?;
        match self.fill_batch_in(&txn, lock, chain, valid).await {
            Ok(pass) => {
                txn.commit().await?;
                tracing::info!(
                    batch_id = ?pass.batch_id,
                    processing = pass.processing.len(),
                    deferred = pass.deferred.len(),
                    "batch assembled"
                );
                Ok(pass)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                tracing::error!(chain, error = %e, "batch assembly rolled back");
                Err(e)
            }
        }
    }

    async fn fill_batch_in(
        &self,
        txn: &DatabaseTransaction,
        lock: &LockGuard,
        chain: &str,
        valid: Vec<OnchainItem>,
    ) -> Result<BatchPass, ServiceError> {
        let mut accepted = Vec::with_capacity(valid.len());
        let mut skipped = Vec::new();
        for item in valid {
            if is_unprocessed(&status_history(txn, item.withdraw_id).await?) {
                accepted.push(item);
            } else {
                skipped.push(item.withdraw_id);
            }
        }
        if accepted.is_empty() {
            return Ok(BatchPass {
                batch_id: None,
                processing: Vec::new(),
                deferred: Vec::new(),
                skipped,
                tx_id: None,
            });
        }

        let batch = self
            .batches
            .find_or_create_batch_in(txn, chain, &self.ctx.batch)
            .await?;
        let capacity = u32::try_from(batch.capacity)
            .ok()
            .filter(|&capacity| capacity > 0)
            .ok_or(BatchError::CorruptCapacity {
                batch_id: batch.id,
                capacity: batch.capacity,
            })?;
        let attached = self.batches.count_withdraws_in(txn, batch.id).await?;
        let room = remaining_capacity(capacity, attached);
        let deferred: Vec<i64> = if accepted.len() > room {
            accepted
                .split_off(room)
                .into_iter()
                .map(|item| item.withdraw_id)
                .collect()
        } else {
            Vec::new()
        };

        let mut pass = BatchPass {
            batch_id: Some(batch.id),
            processing: accepted.iter().map(|item| item.withdraw_id).collect(),
            deferred,
            skipped,
            tx_id: None,
        };
        if accepted.is_empty() {
            return Ok(pass);
        }

        for item in &accepted {
            append_status(txn, item.withdraw_id, WithdrawStatus::Processing).await?;
        }
        self.batches
            .add_withdraws_in(txn, batch.id, &pass.processing)
            .await?;

        let outputs: Vec<SettlementOutput> = accepted
            .into_iter()
            .map(|item| SettlementOutput {
                withdraw_id: item.withdraw_id,
                public_key: item.public_key,
                amount: item.amount,
            })
            .collect();
        lock.ensure_held().await?;
        let receipt = self.ctx.gateway.submit(chain, &outputs).await?;

        self.batches
            .append_batch_status_in(
                txn,
                batch.id,
                BatchStatus::Processing,
                &BatchInfoData::Crypto(CryptoInfo {
                    tx_id: receipt.tx_id.clone(),
                }),
            )
            .await?;

        lock.ensure_held().await?;
        pass.tx_id = Some(receipt.tx_id);
        Ok(pass)
    }

    async fn cancel_rejected(&self, rejected: Vec<(i64, RejectReason)>) -> Vec<(i64, RejectReason)> {
        let mut canceled = Vec::with_capacity(rejected.len());
        for (withdraw_id, reason) in rejected {
            match self
                .withdraws
                .append_withdraw_status(withdraw_id, WithdrawStatus::Canceled)
                .await
            {
                Ok(_) => canceled.push((withdraw_id, reason)),
                Err(e) => {
                    tracing::error!(withdraw_id, error = %e, "failed to cancel invalid withdraw");
                }
            }
        }
        canceled
    }
}
