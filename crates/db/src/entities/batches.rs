//! `SeaORM` Entity for batches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub network: String,
    pub timestamp: DateTimeWithTimeZone,
    pub execute_after: DateTimeWithTimeZone,
    pub capacity: i32,
    pub data: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::batch_infos::Entity")]
    BatchInfos,
    #[sea_orm(has_many = "super::batch_withdraws::Entity")]
    BatchWithdraws,
}

impl Related<super::batch_infos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchInfos.def()
    }
}

impl Related<super::batch_withdraws::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchWithdraws.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
