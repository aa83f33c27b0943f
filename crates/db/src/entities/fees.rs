//! `SeaORM` Entity for fees table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "fees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub withdraw_id: i64,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub amount: Decimal,
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
