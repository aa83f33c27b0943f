//! Database layer with `SeaORM` entities, repositories and locked services.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for accounts, the operation chain,
//!   withdraws and settlement batches
//! - Repositories that run one step inside a caller's transaction
//! - Services that wrap those steps in distributed locks and transactions
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod services;

pub use repositories::{
    AccountRepository, BatchRepository, LedgerRepository, StoreError, WithdrawRepository,
};
pub use services::{
    AccountService, LedgerService, ServiceContext, ServiceError, WithdrawalProcessor,
};

use custody_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
