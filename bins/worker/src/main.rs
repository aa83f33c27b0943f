//! Custody worker.
//!
//! Reads request envelopes as JSON lines from stdin, runs each on the pool
//! of its subject and writes one JSON response line per request to stdout.
//! Logs go to stderr. A periodic tick runs withdraw processing passes.

mod dispatch;
mod gateway;
mod messages;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use custody_core::batch::BatchSettings;
use custody_db::ServiceContext;
use custody_lock::{DistributedLock, LockSettings};
use custody_shared::AppConfig;
use custody_shared::config::{LockBackend, LockConfig, WorkerConfig};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::dispatch::Dispatcher;
use crate::gateway::LoggingGateway;
use crate::messages::{Envelope, ErrorBody, Response};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "custody=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = custody_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let lock = build_lock(&config.lock).await?;
    let batch = BatchSettings::from_config(&config.batch)?;
    let ctx = ServiceContext::new(db, lock, Arc::new(LoggingGateway), batch);
    let dispatcher = Arc::new(Dispatcher::new(ctx, &config.worker));

    run(
        dispatcher,
        &config.worker,
        tokio::io::stdin(),
        tokio::io::stdout(),
        tokio::signal::ctrl_c(),
    )
    .await
}

async fn build_lock(config: &LockConfig) -> anyhow::Result<DistributedLock> {
    let settings = LockSettings::from(config);
    match config.backend {
        LockBackend::Memory => {
            warn!("Using in-process lock table; run a single worker only");
            Ok(DistributedLock::in_memory(settings))
        }
        LockBackend::Redis => redis_lock(config, settings).await,
    }
}

#[cfg(feature = "redis")]
async fn redis_lock(config: &LockConfig, settings: LockSettings) -> anyhow::Result<DistributedLock> {
    let url = config
        .redis_url
        .as_deref()
        .context("lock.redis_url is required for the redis backend")?;
    let provider = custody_lock::RedisLockProvider::connect(url).await?;
    Ok(DistributedLock::new(Arc::new(provider), settings))
}

#[cfg(not(feature = "redis"))]
async fn redis_lock(_config: &LockConfig, _settings: LockSettings) -> anyhow::Result<DistributedLock> {
    anyhow::bail!("redis lock backend requested but the worker was built without the `redis` feature")
}

/// Serves requests from `input` until `shutdown` completes.
///
/// Closing `input` ends the worker only when no processing tick is configured.
async fn run<R, W, S>(
    dispatcher: Arc<Dispatcher>,
    worker: &WorkerConfig,
    input: R,
    mut output: W,
    shutdown: S,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future,
{
    let (tx, mut rx) = mpsc::channel::<Response>(256);

    let writer = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let mut line = match serde_json::to_string(&response) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "failed to encode response");
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = output.write_all(line.as_bytes()).await {
                error!(error = %e, "failed to write response");
                break;
            }
            if let Err(e) = output.flush().await {
                error!(error = %e, "failed to flush responses");
                break;
            }
        }
    });

    let mut lines = BufReader::new(input).lines();
    let mut input_open = true;
    let mut ticker = (worker.process_interval_secs > 0).then(|| {
        let mut interval = tokio::time::interval(Duration::from_secs(worker.process_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });
    let mut tasks = JoinSet::new();
    tokio::pin!(shutdown);

    info!(interval_secs = worker.process_interval_secs, "Worker ready");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            line = lines.next_line(), if input_open => match line.context("failed to read input")? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match serde_json::from_str::<Envelope>(&line) {
                    Ok(envelope) => spawn_request(&mut tasks, &dispatcher, envelope, Some(tx.clone())),
                    Err(e) => {
                        warn!(error = %e, "invalid message");
                        let body = ErrorBody {
                            code: "INVALID_MESSAGE".to_string(),
                            retryable: false,
                            message: e.to_string(),
                        };
                        if tx.send(Response::failure(None, "", body)).await.is_err() {
                            break;
                        }
                    }
                },
                None if ticker.is_some() => {
                    info!("Input closed, scheduled processing continues");
                    input_open = false;
                }
                None => {
                    info!("Input closed");
                    break;
                }
            },
            () = next_tick(&mut ticker) => {
                spawn_request(&mut tasks, &dispatcher, Envelope::process_tick(), None);
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "request task failed");
                }
            }
        }
    }

    info!(in_flight = tasks.len(), "Draining requests");
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "request task failed");
        }
    }
    dispatcher.close();
    drop(tx);
    writer.await.context("response writer failed")?;

    info!("Worker stopped");
    Ok(())
}

fn spawn_request(
    tasks: &mut JoinSet<()>,
    dispatcher: &Arc<Dispatcher>,
    envelope: Envelope,
    reply: Option<mpsc::Sender<Response>>,
) {
    let dispatcher = Arc::clone(dispatcher);
    tasks.spawn(async move {
        let response = dispatcher.dispatch(envelope).await;
        match reply {
            Some(tx) => {
                if tx.send(response).await.is_err() {
                    warn!("response channel closed");
                }
            }
            None => {
                if let Some(error) = &response.error {
                    warn!(code = %error.code, message = %error.message, "scheduled processing pass failed");
                }
            }
        }
    });
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ACCOUNT_CREATE, WITHDRAW_CREATE};
    use custody_core::withdraw::WithdrawStatus;
    use custody_db::WithdrawRepository;
    use custody_db::migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use serde_json::{Value, json};
    use std::time::Instant;

    async fn dispatcher() -> (Arc<Dispatcher>, DatabaseConnection) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let ctx = ServiceContext::new(
            db.clone(),
            DistributedLock::in_memory(LockSettings::default()),
            Arc::new(LoggingGateway),
            BatchSettings::default(),
        );
        (Arc::new(Dispatcher::new(ctx, &WorkerConfig::default())), db)
    }

    async fn request(dispatcher: &Dispatcher, subject: &str, payload: Value) -> Value {
        let response = dispatcher
            .dispatch(Envelope {
                id: None,
                subject: subject.to_string(),
                payload,
            })
            .await;
        response.data.unwrap()
    }

    #[tokio::test]
    async fn test_closed_input_keeps_scheduled_processing() {
        let (dispatcher, db) = dispatcher().await;
        let mut accounts = Vec::new();
        for user_id in [1, 2] {
            let info = request(
                &dispatcher,
                ACCOUNT_CREATE,
                json!({"user_id": user_id, "currency": "BTC", "name": "Main"}),
            )
            .await;
            accounts.push(info["account_id"].as_i64().unwrap());
        }
        let withdraw_id = request(
            &dispatcher,
            WITHDRAW_CREATE,
            json!({
                "from_account_id": accounts[0],
                "to_account_id": accounts[1],
                "amount": "1",
                "target_type": "onchain",
                "target": {"chain": "bitcoin", "public_key": "bc1q"}
            }),
        )
        .await["withdraw_id"]
            .as_i64()
            .unwrap();

        let worker = WorkerConfig {
            process_interval_secs: 1,
            ..WorkerConfig::default()
        };
        let grace = Duration::from_millis(300);
        let started = Instant::now();
        run(
            Arc::clone(&dispatcher),
            &worker,
            tokio::io::empty(),
            tokio::io::sink(),
            tokio::time::sleep(grace),
        )
        .await
        .unwrap();

        assert!(started.elapsed() >= grace);
        assert_eq!(
            WithdrawRepository::new(db)
                .current_withdraw_status(withdraw_id)
                .await
                .unwrap(),
            WithdrawStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_closed_input_stops_worker_without_tick() {
        let (dispatcher, _db) = dispatcher().await;
        let worker = WorkerConfig {
            process_interval_secs: 0,
            ..WorkerConfig::default()
        };

        run(
            dispatcher,
            &worker,
            tokio::io::empty(),
            tokio::io::sink(),
            std::future::pending::<()>(),
        )
        .await
        .unwrap();
    }
}
