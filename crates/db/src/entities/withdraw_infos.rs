//! `SeaORM` Entity for withdraw_infos table.

use super::sea_orm_active_enums::WithdrawStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "withdraw_infos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub withdraw_id: i64,
    pub status: WithdrawStatus,
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::withdraws::Entity",
        from = "Column::WithdrawId",
        to = "super::withdraws::Column::Id"
    )]
    Withdraws,
}

impl Related<super::withdraws::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdraws.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
