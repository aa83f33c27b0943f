//! `SeaORM` entity definitions.

pub mod prelude;

pub mod account_operations;
pub mod account_states;
pub mod accounts;
pub mod batch_infos;
pub mod batch_withdraws;
pub mod batches;
pub mod currencies;
pub mod fees;
pub mod sea_orm_active_enums;
pub mod withdraw_infos;
pub mod withdraw_targets;
pub mod withdraws;
