//! `SeaORM` Entity for accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub currency: String,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::Currency",
        to = "super::currencies::Column::Name"
    )]
    Currencies,
    #[sea_orm(has_one = "super::account_states::Entity")]
    AccountStates,
    #[sea_orm(has_many = "super::account_operations::Entity")]
    AccountOperations,
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl Related<super::account_states::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountStates.def()
    }
}

impl Related<super::account_operations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountOperations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
