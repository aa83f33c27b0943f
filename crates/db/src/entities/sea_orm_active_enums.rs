//! `SeaORM` active enums, stored as their canonical lowercase strings.
//!
//! Each enum mirrors a domain enum of `custody-core` and converts both ways.

use custody_core::account::AccountStatus as DomainAccountStatus;
use custody_core::batch::{BatchInfoType as DomainBatchInfoType, BatchStatus as DomainBatchStatus};
use custody_core::ledger::{
    OperationType as DomainOperationType, SynchronousType as DomainSynchronousType,
};
use custody_core::withdraw::{
    BatchMode as DomainBatchMode, WithdrawStatus as DomainWithdrawStatus,
    WithdrawTargetType as DomainWithdrawTargetType,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

macro_rules! mirror_domain_enum {
    ($db:ident <=> $domain:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$domain> for $db {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$db> for $domain {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AccountStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "locked")]
    Locked,
    #[sea_orm(string_value = "disabled")]
    Disabled,
}

mirror_domain_enum!(AccountStatus <=> DomainAccountStatus {
    Created,
    Normal,
    Locked,
    Disabled,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SynchronousType {
    #[sea_orm(string_value = "sync")]
    Sync,
    #[sea_orm(string_value = "async-start")]
    AsyncStart,
    #[sea_orm(string_value = "async-end")]
    AsyncEnd,
}

mirror_domain_enum!(SynchronousType <=> DomainSynchronousType {
    Sync,
    AsyncStart,
    AsyncEnd,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OperationType {
    #[sea_orm(string_value = "init")]
    Init,
    #[sea_orm(string_value = "deposit")]
    Deposit,
    #[sea_orm(string_value = "withdraw")]
    Withdraw,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "transfer_fee")]
    TransferFee,
    #[sea_orm(string_value = "refund")]
    Refund,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "other")]
    Other,
}

mirror_domain_enum!(OperationType <=> DomainOperationType {
    Init,
    Deposit,
    Withdraw,
    Transfer,
    TransferFee,
    Refund,
    Adjustment,
    None,
    Other,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BatchMode {
    #[sea_orm(string_value = "instant")]
    Instant,
    #[sea_orm(string_value = "fast")]
    Fast,
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "slow")]
    Slow,
}

mirror_domain_enum!(BatchMode <=> DomainBatchMode {
    Instant,
    Fast,
    Normal,
    Slow,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum WithdrawStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "settled")]
    Settled,
    #[sea_orm(string_value = "canceling")]
    Canceling,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

mirror_domain_enum!(WithdrawStatus <=> DomainWithdrawStatus {
    Created,
    Processing,
    Settled,
    Canceling,
    Canceled,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum WithdrawTargetType {
    #[sea_orm(string_value = "onchain")]
    Onchain,
    #[sea_orm(string_value = "liquid")]
    Liquid,
    #[sea_orm(string_value = "lightning")]
    Lightning,
    #[sea_orm(string_value = "sepa")]
    Sepa,
    #[sea_orm(string_value = "swift")]
    Swift,
    #[sea_orm(string_value = "card")]
    Card,
}

mirror_domain_enum!(WithdrawTargetType <=> DomainWithdrawTargetType {
    Onchain,
    Liquid,
    Lightning,
    Sepa,
    Swift,
    Card,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BatchStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "settled")]
    Settled,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

mirror_domain_enum!(BatchStatus <=> DomainBatchStatus {
    Created,
    Ready,
    Processing,
    Settled,
    Canceled,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BatchInfoType {
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "crypto")]
    Crypto,
}

mirror_domain_enum!(BatchInfoType <=> DomainBatchInfoType { None, Crypto });
