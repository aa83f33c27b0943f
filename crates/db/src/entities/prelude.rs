//! Entity re-exports.

pub use super::account_operations::Entity as AccountOperations;
pub use super::account_states::Entity as AccountStates;
pub use super::accounts::Entity as Accounts;
pub use super::batch_infos::Entity as BatchInfos;
pub use super::batch_withdraws::Entity as BatchWithdraws;
pub use super::batches::Entity as Batches;
pub use super::currencies::Entity as Currencies;
pub use super::fees::Entity as Fees;
pub use super::withdraw_infos::Entity as WithdrawInfos;
pub use super::withdraw_targets::Entity as WithdrawTargets;
pub use super::withdraws::Entity as Withdraws;
