//! `SeaORM` Entity for withdraws table.

use super::sea_orm_active_enums::BatchMode;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "withdraws")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub amount: Decimal,
    pub batch_mode: BatchMode,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::withdraw_infos::Entity")]
    WithdrawInfos,
    #[sea_orm(has_one = "super::withdraw_targets::Entity")]
    WithdrawTargets,
    #[sea_orm(has_one = "super::fees::Entity")]
    Fees,
}

impl Related<super::withdraw_infos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawInfos.def()
    }
}

impl Related<super::withdraw_targets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawTargets.def()
    }
}

impl Related<super::fees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
