//! Database migration runner for the custody schema.
//!
//! Usage:
//!   migrator up      - Apply the custody schema and currency seed
//!   migrator down    - Drop the custody schema
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The database is taken from `DATABASE_URL`.

use custody_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI installs its own tracing subscriber
    cli::run_cli(Migrator).await;
}
