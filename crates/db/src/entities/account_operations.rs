//! `SeaORM` Entity for account_operations table.

use super::sea_orm_active_enums::{OperationType, SynchronousType};
use chrono::Utc;
use custody_core::ledger::OperationRecord;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "account_operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    pub synchronous_type: SynchronousType,
    pub operation_type: OperationType,
    pub reference_id: i64,
    pub timestamp: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub lock_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub total_locked: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for OperationRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            synchronous_type: model.synchronous_type.into(),
            operation_type: model.operation_type.into(),
            reference_id: model.reference_id,
            timestamp: model.timestamp.with_timezone(&Utc),
            amount: model.amount,
            balance: model.balance,
            lock_amount: model.lock_amount,
            total_locked: model.total_locked,
        }
    }
}
