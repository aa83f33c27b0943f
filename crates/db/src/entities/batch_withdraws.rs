//! `SeaORM` Entity for batch_withdraws table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_withdraws")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub batch_id: i64,
    #[sea_orm(primary_key, auto_increment = false, unique)]
    pub withdraw_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::batches::Entity",
        from = "Column::BatchId",
        to = "super::batches::Column::Id"
    )]
    Batches,
    #[sea_orm(
        belongs_to = "super::withdraws::Entity",
        from = "Column::WithdrawId",
        to = "super::withdraws::Column::Id"
    )]
    Withdraws,
}

impl Related<super::batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl Related<super::withdraws::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdraws.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
