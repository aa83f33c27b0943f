//! `SeaORM` Entity for withdraw_targets table.
//!
//! `data` holds the destination payload; its shape is decided by `target_type`.

use super::sea_orm_active_enums::WithdrawTargetType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "withdraw_targets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub withdraw_id: i64,
    pub target_type: WithdrawTargetType,
    pub data: Json,
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
