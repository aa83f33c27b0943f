//! Initial custody schema: currencies, accounts, the operation ledger,
//! withdraws and settlement batches.
//!
//! Statements are built with sea-query so the same migration runs on
//! Postgres and SQLite.

use sea_orm::DatabaseBackend;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Currencies available at bootstrap: `(name, available)`.
const SEED_CURRENCIES: [(&str, bool); 4] = [
    ("BTC", true),
    ("LBTC", true),
    ("CHF", true),
    ("EUR", true),
];

/// Fixed-point money column. SQLite has no exact decimal type and the driver
/// exchanges decimals as doubles there, so it gets a REAL column.
fn money(column: impl IntoIden, backend: DatabaseBackend) -> ColumnDef {
    let mut def = ColumnDef::new(column);
    match backend {
        DatabaseBackend::Sqlite => def.double(),
        _ => def.decimal_len(30, 12),
    };
    def.not_null().to_owned()
}

fn id(column: impl IntoIden) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn status(column: impl IntoIden) -> ColumnDef {
    ColumnDef::new(column).string_len(16).not_null().to_owned()
}

fn timestamp(column: impl IntoIden) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        // ========== Currencies ==========
        manager
            .create_table(
                Table::create()
                    .table(Currencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Currencies::Name)
                            .string_len(16)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Currencies::Available)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        let mut seed = Query::insert();
        seed.into_table(Currencies::Table)
            .columns([Currencies::Name, Currencies::Available]);
        for (name, available) in SEED_CURRENCIES {
            seed.values([name.into(), available.into()])
                .map_err(|e| DbErr::Migration(e.to_string()))?;
        }
        manager.exec_stmt(seed).await?;

        // ========== Accounts ==========
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(&mut id(Accounts::Id))
                    .col(ColumnDef::new(Accounts::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::Currency).string_len(16).not_null())
                    .col(ColumnDef::new(Accounts::Name).string_len(255).not_null())
                    .col(&mut timestamp(Accounts::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_currency")
                            .from(Accounts::Table, Accounts::Currency)
                            .to(Currencies::Table, Currencies::Name),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_user")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountStates::Table)
                    .if_not_exists()
                    .col(&mut id(AccountStates::Id))
                    .col(
                        ColumnDef::new(AccountStates::AccountId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut status(AccountStates::Status))
                    .col(&mut timestamp(AccountStates::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_states_account")
                            .from(AccountStates::Table, AccountStates::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== Operation ledger ==========
        manager
            .create_table(
                Table::create()
                    .table(AccountOperations::Table)
                    .if_not_exists()
                    .col(&mut id(AccountOperations::Id))
                    .col(
                        ColumnDef::new(AccountOperations::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(&mut status(AccountOperations::SynchronousType))
                    .col(&mut status(AccountOperations::OperationType))
                    .col(
                        ColumnDef::new(AccountOperations::ReferenceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(&mut timestamp(AccountOperations::Timestamp))
                    .col(&mut money(AccountOperations::Amount, backend))
                    .col(&mut money(AccountOperations::Balance, backend))
                    .col(&mut money(AccountOperations::LockAmount, backend))
                    .col(&mut money(AccountOperations::TotalLocked, backend))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_operations_account")
                            .from(AccountOperations::Table, AccountOperations::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Latest-operation lookup walks this index backwards
        manager
            .create_index(
                Index::create()
                    .name("idx_account_operations_account")
                    .table(AccountOperations::Table)
                    .col(AccountOperations::AccountId)
                    .col(AccountOperations::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_account_operations_reference")
                    .table(AccountOperations::Table)
                    .col(AccountOperations::AccountId)
                    .col(AccountOperations::ReferenceId)
                    .to_owned(),
            )
            .await?;

        // ========== Withdraws ==========
        manager
            .create_table(
                Table::create()
                    .table(Withdraws::Table)
                    .if_not_exists()
                    .col(&mut id(Withdraws::Id))
                    .col(
                        ColumnDef::new(Withdraws::FromAccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Withdraws::ToAccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(&mut money(Withdraws::Amount, backend))
                    .col(&mut status(Withdraws::BatchMode))
                    .col(&mut timestamp(Withdraws::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdraws_from_account")
                            .from(Withdraws::Table, Withdraws::FromAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdraws_to_account")
                            .from(Withdraws::Table, Withdraws::ToAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WithdrawInfos::Table)
                    .if_not_exists()
                    .col(&mut id(WithdrawInfos::Id))
                    .col(
                        ColumnDef::new(WithdrawInfos::WithdrawId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(&mut status(WithdrawInfos::Status))
                    .col(&mut timestamp(WithdrawInfos::Timestamp))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdraw_infos_withdraw")
                            .from(WithdrawInfos::Table, WithdrawInfos::WithdrawId)
                            .to(Withdraws::Table, Withdraws::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_withdraw_infos_withdraw")
                    .table(WithdrawInfos::Table)
                    .col(WithdrawInfos::WithdrawId)
                    .col(WithdrawInfos::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_withdraw_infos_status")
                    .table(WithdrawInfos::Table)
                    .col(WithdrawInfos::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WithdrawTargets::Table)
                    .if_not_exists()
                    .col(&mut id(WithdrawTargets::Id))
                    .col(
                        ColumnDef::new(WithdrawTargets::WithdrawId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut status(WithdrawTargets::TargetType))
                    .col(ColumnDef::new(WithdrawTargets::Data).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdraw_targets_withdraw")
                            .from(WithdrawTargets::Table, WithdrawTargets::WithdrawId)
                            .to(Withdraws::Table, Withdraws::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Fees::Table)
                    .if_not_exists()
                    .col(&mut id(Fees::Id))
                    .col(
                        ColumnDef::new(Fees::WithdrawId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut money(Fees::Amount, backend))
                    .col(ColumnDef::new(Fees::Data).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fees_withdraw")
                            .from(Fees::Table, Fees::WithdrawId)
                            .to(Withdraws::Table, Withdraws::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== Batches ==========
        manager
            .create_table(
                Table::create()
                    .table(Batches::Table)
                    .if_not_exists()
                    .col(&mut id(Batches::Id))
                    .col(ColumnDef::new(Batches::Network).string_len(64).not_null())
                    .col(&mut timestamp(Batches::Timestamp))
                    .col(&mut timestamp(Batches::ExecuteAfter))
                    .col(ColumnDef::new(Batches::Capacity).integer().not_null())
                    .col(ColumnDef::new(Batches::Data).json().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batches_network")
                    .table(Batches::Table)
                    .col(Batches::Network)
                    .col(Batches::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BatchInfos::Table)
                    .if_not_exists()
                    .col(&mut id(BatchInfos::Id))
                    .col(ColumnDef::new(BatchInfos::BatchId).big_integer().not_null())
                    .col(&mut status(BatchInfos::Status))
                    .col(&mut status(BatchInfos::InfoType))
                    .col(ColumnDef::new(BatchInfos::Data).json().not_null())
                    .col(&mut timestamp(BatchInfos::Timestamp))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batch_infos_batch")
                            .from(BatchInfos::Table, BatchInfos::BatchId)
                            .to(Batches::Table, Batches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batch_infos_batch")
                    .table(BatchInfos::Table)
                    .col(BatchInfos::BatchId)
                    .col(BatchInfos::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BatchWithdraws::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BatchWithdraws::BatchId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BatchWithdraws::WithdrawId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(BatchWithdraws::BatchId)
                            .col(BatchWithdraws::WithdrawId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batch_withdraws_batch")
                            .from(BatchWithdraws::Table, BatchWithdraws::BatchId)
                            .to(Batches::Table, Batches::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batch_withdraws_withdraw")
                            .from(BatchWithdraws::Table, BatchWithdraws::WithdrawId)
                            .to(Withdraws::Table, Withdraws::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // A withdraw belongs to at most one batch
        manager
            .create_index(
                Index::create()
                    .name("idx_batch_withdraws_withdraw")
                    .table(BatchWithdraws::Table)
                    .col(BatchWithdraws::WithdrawId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse dependency order
        drop_table(manager, BatchWithdraws::Table).await?;
        drop_table(manager, BatchInfos::Table).await?;
        drop_table(manager, Batches::Table).await?;
        drop_table(manager, Fees::Table).await?;
        drop_table(manager, WithdrawTargets::Table).await?;
        drop_table(manager, WithdrawInfos::Table).await?;
        drop_table(manager, Withdraws::Table).await?;
        drop_table(manager, AccountOperations::Table).await?;
        drop_table(manager, AccountStates::Table).await?;
        drop_table(manager, Accounts::Table).await?;
        drop_table(manager, Currencies::Table).await
    }
}

async fn drop_table(manager: &SchemaManager<'_>, table: impl IntoTableRef) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(table).if_exists().to_owned())
        .await
}

#[derive(DeriveIden)]
enum Currencies {
    Table,
    Name,
    Available,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    UserId,
    Currency,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AccountStates {
    Table,
    Id,
    AccountId,
    Status,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AccountOperations {
    Table,
    Id,
    AccountId,
    SynchronousType,
    OperationType,
    ReferenceId,
    Timestamp,
    Amount,
    Balance,
    LockAmount,
    TotalLocked,
}

#[derive(DeriveIden)]
enum Withdraws {
    Table,
    Id,
    FromAccountId,
    ToAccountId,
    Amount,
    BatchMode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WithdrawInfos {
    Table,
    Id,
    WithdrawId,
    Status,
    Timestamp,
}

#[derive(DeriveIden)]
enum WithdrawTargets {
    Table,
    Id,
    WithdrawId,
    TargetType,
    Data,
}

#[derive(DeriveIden)]
enum Fees {
    Table,
    Id,
    WithdrawId,
    Amount,
    Data,
}

#[derive(DeriveIden)]
enum Batches {
    Table,
    Id,
    Network,
    Timestamp,
    ExecuteAfter,
    Capacity,
    Data,
}

#[derive(DeriveIden)]
enum BatchInfos {
    Table,
    Id,
    BatchId,
    Status,
    InfoType,
    Data,
    Timestamp,
}

#[derive(DeriveIden)]
enum BatchWithdraws {
    Table,
    BatchId,
    WithdrawId,
}
