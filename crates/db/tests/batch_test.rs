//! Batch repository integration tests.

mod common;

use chrono::Duration;
use common::{create_onchain_withdraw, open_account, setup};
use custody_core::batch::{BatchError, BatchInfoData, BatchSettings, BatchStatus, CryptoInfo};
use custody_db::StoreError;
use custody_db::repositories::BatchRepository;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_find_or_create_returns_same_open_batch() {
    let env = setup().await;
    let repo = BatchRepository::new(env.db.clone());
    let settings = BatchSettings::default();

    let first = repo.find_or_create_batch("bitcoin", &settings).await.unwrap();
    let second = repo.find_or_create_batch("bitcoin", &settings).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.capacity, 16);
    assert_eq!(
        repo.current_batch_status(first.id).await.unwrap(),
        BatchStatus::Created
    );
}

#[tokio::test]
async fn test_new_batch_once_open_batch_advances() {
    let env = setup().await;
    let repo = BatchRepository::new(env.db.clone());
    let settings = BatchSettings::new(4, Duration::minutes(10)).unwrap();

    let first = repo.find_or_create_batch("liquid", &settings).await.unwrap();
    assert_eq!(first.capacity, 4);
    assert_eq!(
        first.execute_after - first.timestamp,
        Duration::minutes(10)
    );

    repo.append_batch_status(first.id, BatchStatus::Ready, &BatchInfoData::None)
        .await
        .unwrap();
    let second = repo.find_or_create_batch("liquid", &settings).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(repo.find_open_batch("liquid").await.unwrap(), Some(second));
    assert!(repo.find_open_batch("bitcoin").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unlocked_find_then_create_duplicates_batches() {
    let env = setup().await;
    let repo = BatchRepository::new(env.db.clone());
    let settings = BatchSettings::default();

    // Two workers each observe "no open batch" before either creates one
    let seen_by_a = repo.find_open_batch("bitcoin").await.unwrap();
    let seen_by_b = repo.find_open_batch("bitcoin").await.unwrap();
    assert!(seen_by_a.is_none() && seen_by_b.is_none());
    let a = repo.create_batch("bitcoin", &settings).await.unwrap();
    let b = repo.create_batch("bitcoin", &settings).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(
        repo.current_batch_status(a.id).await.unwrap(),
        BatchStatus::Created
    );
    assert_eq!(
        repo.current_batch_status(b.id).await.unwrap(),
        BatchStatus::Created
    );
}

#[tokio::test]
async fn test_batch_status_history_and_payload() {
    let env = setup().await;
    let repo = BatchRepository::new(env.db.clone());
    let batch = repo
        .find_or_create_batch("bitcoin", &BatchSettings::default())
        .await
        .unwrap();
    let crypto = BatchInfoData::Crypto(CryptoInfo {
        tx_id: "abc123".to_string(),
    });

    repo.append_batch_status(batch.id, BatchStatus::Processing, &crypto)
        .await
        .unwrap();
    let err = repo
        .append_batch_status(batch.id, BatchStatus::Created, &BatchInfoData::None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Batch(BatchError::InvalidStatusTransition { .. })
    ));

    let history = repo.batch_history(batch.id).await.unwrap();
    assert_eq!(
        history,
        vec![
            (BatchStatus::Created, BatchInfoData::None),
            (BatchStatus::Processing, crypto)
        ]
    );
}

#[tokio::test]
async fn test_attach_withdraws() {
    let env = setup().await;
    let from = open_account(&env, 1, "BTC").await;
    let to = open_account(&env, 2, "BTC").await;
    let first = create_onchain_withdraw(&env, from, to, dec!(1), "bitcoin", "a").await;
    let second = create_onchain_withdraw(&env, from, to, dec!(1), "bitcoin", "b").await;
    let repo = BatchRepository::new(env.db.clone());
    let batch = repo
        .find_or_create_batch("bitcoin", &BatchSettings::default())
        .await
        .unwrap();

    repo.add_withdraws_in(&env.db, batch.id, &[second, first])
        .await
        .unwrap();

    assert_eq!(repo.batch_withdraws(batch.id).await.unwrap(), vec![first, second]);
    assert_eq!(repo.count_withdraws_in(&env.db, batch.id).await.unwrap(), 2);
    assert_eq!(repo.batch_of_withdraw(first).await.unwrap(), Some(batch.id));

    // A withdraw belongs to at most one batch
    let other = repo.create_batch("bitcoin", &BatchSettings::default()).await.unwrap();
    assert!(repo.add_withdraws_in(&env.db, other.id, &[first]).await.is_err());
}

#[tokio::test]
async fn test_invalid_network_and_ids() {
    let env = setup().await;
    let repo = BatchRepository::new(env.db.clone());

    let err = repo
        .find_or_create_batch("  ", &BatchSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Batch(BatchError::InvalidNetwork)));

    let err = repo.get_batch(0).await.unwrap_err();
    assert!(matches!(err, StoreError::Batch(BatchError::InvalidBatchId)));

    let err = repo.get_batch(77).await.unwrap_err();
    assert!(matches!(err, StoreError::Batch(BatchError::NotFound(77))));
}

#[tokio::test]
async fn test_open_batch_is_judged_by_newest_status_only() {
    let env = setup().await;
    let repo = BatchRepository::new(env.db.clone());
    let settings = BatchSettings::default();

    for _ in 0..5 {
        let batch = repo.create_batch("bitcoin", &settings).await.unwrap();
        repo.append_batch_status(
            batch.id,
            BatchStatus::Processing,
            &BatchInfoData::Crypto(CryptoInfo {
                tx_id: format!("tx-{}", batch.id),
            }),
        )
        .await
        .unwrap();
    }
    repo.create_batch("liquid", &settings).await.unwrap();

    // Every bitcoin batch still has its old `created` row
    assert!(repo.find_open_batch("bitcoin").await.unwrap().is_none());

    let older_open = repo.create_batch("bitcoin", &settings).await.unwrap();
    let newer_open = repo.create_batch("bitcoin", &settings).await.unwrap();
    assert_eq!(
        repo.find_open_batch("bitcoin").await.unwrap(),
        Some(newer_open.clone())
    );

    repo.append_batch_status(newer_open.id, BatchStatus::Ready, &BatchInfoData::None)
        .await
        .unwrap();
    assert_eq!(
        repo.find_open_batch("bitcoin").await.unwrap(),
        Some(older_open)
    );
}
