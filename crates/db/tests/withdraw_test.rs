//! Withdraw repository integration tests.

mod common;

use common::{create_onchain_withdraw, open_account, setup};
use custody_core::withdraw::{
    BatchMode, SepaTarget, WithdrawError, WithdrawStatus, WithdrawTargetData, WithdrawTargetType,
};
use custody_db::StoreError;
use custody_db::entities::fees;
use custody_db::repositories::CreateWithdrawInput;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

#[tokio::test]
async fn test_create_withdraw_writes_target_fee_and_status() {
    let env = setup().await;
    let from = open_account(&env, 1, "BTC").await;
    let to = open_account(&env, 2, "BTC").await;

    let withdraw_id = create_onchain_withdraw(&env, from, to, dec!(0.5), "bitcoin", "bc1qdest").await;

    let details = env.withdraws().get_withdraw_details(withdraw_id).await.unwrap();
    assert_eq!(details.status, WithdrawStatus::Created);
    assert_eq!(details.withdraw.amount, dec!(0.5));
    assert_eq!(details.withdraw.from_account_id, from);

    let target_type: WithdrawTargetType = details.target.target_type.into();
    let data = WithdrawTargetData::decode(target_type, &details.target.data).unwrap();
    match data {
        WithdrawTargetData::Onchain(target) => {
            assert_eq!(target.chain, "bitcoin");
            assert_eq!(target.public_key, "bc1qdest");
        }
        other => panic!("unexpected target {other:?}"),
    }

    let fee = fees::Entity::find()
        .filter(fees::Column::WithdrawId.eq(withdraw_id))
        .one(&env.db)
        .await
        .unwrap()
        .expect("fee row");
    assert_eq!(fee.amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_create_withdraw_validation() {
    let env = setup().await;
    let from = open_account(&env, 1, "EUR").await;
    let repo = env.withdraws();
    let sepa = WithdrawTargetData::Sepa(SepaTarget {
        beneficiary: "Jane Doe".to_string(),
        iban: "CH9300762011623852957".to_string(),
        bic: "POFICHBEXXX".to_string(),
    });

    let err = repo
        .create_withdraw(CreateWithdrawInput {
            from_account_id: from,
            to_account_id: from,
            amount: dec!(-1),
            batch_mode: BatchMode::Slow,
            target: sepa.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Withdraw(WithdrawError::NonPositiveAmount)));

    let err = repo
        .create_withdraw(CreateWithdrawInput {
            from_account_id: from,
            to_account_id: 999,
            amount: dec!(1),
            batch_mode: BatchMode::Slow,
            target: sepa,
        })
        .await
        .unwrap_err();
    assert!(err.as_ledger().is_some());
    assert!(repo.fetch_created_withdraws().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_history_follows_state_machine() {
    let env = setup().await;
    let from = open_account(&env, 1, "BTC").await;
    let to = open_account(&env, 2, "BTC").await;
    let withdraw_id = create_onchain_withdraw(&env, from, to, dec!(1), "bitcoin", "bc1q").await;
    let repo = env.withdraws();

    repo.append_withdraw_status(withdraw_id, WithdrawStatus::Processing)
        .await
        .unwrap();
    let err = repo
        .append_withdraw_status(withdraw_id, WithdrawStatus::Created)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Withdraw(WithdrawError::InvalidStatusTransition {
            from: WithdrawStatus::Processing,
            to: WithdrawStatus::Created,
        })
    ));
    repo.append_withdraw_status(withdraw_id, WithdrawStatus::Settled)
        .await
        .unwrap();

    let history: Vec<WithdrawStatus> = repo
        .withdraw_history(withdraw_id)
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.status.into())
        .collect();
    assert_eq!(
        history,
        vec![
            WithdrawStatus::Created,
            WithdrawStatus::Processing,
            WithdrawStatus::Settled
        ]
    );
    assert_eq!(
        repo.current_withdraw_status(withdraw_id).await.unwrap(),
        WithdrawStatus::Settled
    );
}

#[tokio::test]
async fn test_cancel_withdraw() {
    let env = setup().await;
    let from = open_account(&env, 1, "BTC").await;
    let to = open_account(&env, 2, "BTC").await;
    let withdraw_id = create_onchain_withdraw(&env, from, to, dec!(1), "bitcoin", "bc1q").await;
    let repo = env.withdraws();

    repo.cancel_withdraw(withdraw_id).await.unwrap();
    assert_eq!(
        repo.current_withdraw_status(withdraw_id).await.unwrap(),
        WithdrawStatus::Canceled
    );

    let err = repo.cancel_withdraw(withdraw_id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Withdraw(WithdrawError::InvalidStatusTransition { .. })
    ));

    let err = repo.cancel_withdraw(12345).await.unwrap_err();
    assert!(matches!(err, StoreError::Withdraw(WithdrawError::NotFound(12345))));
}

#[tokio::test]
async fn test_fetch_created_withdraws_skips_advanced() {
    let env = setup().await;
    let from = open_account(&env, 1, "BTC").await;
    let to = open_account(&env, 2, "BTC").await;
    let first = create_onchain_withdraw(&env, from, to, dec!(1), "bitcoin", "a").await;
    let second = create_onchain_withdraw(&env, from, to, dec!(2), "bitcoin", "b").await;
    let third = create_onchain_withdraw(&env, from, to, dec!(3), "liquid", "c").await;
    env.withdraws()
        .append_withdraw_status(second, WithdrawStatus::Processing)
        .await
        .unwrap();

    let ids: Vec<i64> = env
        .withdraws()
        .fetch_created_withdraws()
        .await
        .unwrap()
        .into_iter()
        .map(|target| target.withdraw_id)
        .collect();

    assert_eq!(ids, vec![first, third]);
}
