//! LWGS Person-Data Sync Service - Main Entry Point

mod settings;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lwgs_core::application::consumer::{spawn_worker_pool, StateQueueWorker};
use lwgs_core::application::{
    FullSyncStateManager, QueueStatsProbe, SedexMessageStateProcessor, TransactionStateProcessor,
};
use lwgs_core::domain::topology::{ALL_QUEUES, QUEUE_SEDEX_STATE, QUEUE_TRANSACTION_STATE};
use lwgs_core::port::id_provider::UuidProvider;
use lwgs_core::port::time_provider::SystemTimeProvider;
use lwgs_core::port::{MessageBroker, SettingRepository, StateStore};
use lwgs_infra_broker::{declare_standard_topology, InMemoryBroker};
use lwgs_infra_sqlite::{
    create_pool, run_migrations, SqliteSettingRepository, SqliteStateStore,
};
use settings::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const MIN_TRANSACTION_STATE_WORKERS: usize = 2;
const MAX_TRANSACTION_STATE_WORKERS: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let log_format = std::env::var("LWGS_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("lwgs=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("LWGS person-data sync service v{} starting...", VERSION);

    // 2. Load configuration
    let config = DaemonConfig::load()?;
    let db_path = config.expanded_db_path();

    // The admission surface lives outside this process; the sender
    // configuration is still validated and surfaced at startup
    let sedex = config.sedex_config();
    info!(
        multi_sender = sedex.multi_sender,
        accepted_senders = if sedex.multi_sender { sedex.sender_ids.len() } else { 1 },
        "Sedex sender configuration loaded"
    );

    info!(db_path = %db_path, "Initializing database...");

    // 3. Initialize database
    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Broker topology
    let broker: Arc<dyn MessageBroker> = {
        let broker = InMemoryBroker::new();
        declare_standard_topology(&broker)
            .map_err(|e| anyhow::anyhow!("Topology declaration failed: {}", e))?;
        Arc::new(broker)
    };

    // 5. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let settings_repo: Arc<dyn SettingRepository> =
        Arc::new(SqliteSettingRepository::new(pool.clone()));
    let state_store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(pool.clone()));

    // 6. Restore the full-sync lifecycle from persisted settings
    let full_sync = Arc::new(
        FullSyncStateManager::new(id_provider.clone()).with_settings(settings_repo.clone()),
    );
    full_sync
        .restore()
        .await
        .map_err(|e| anyhow::anyhow!("Full-sync restore failed: {}", e))?;

    // 7. State processors
    let transaction_processor = Arc::new(TransactionStateProcessor::new(
        state_store.clone(),
        full_sync.clone(),
        time_provider.clone(),
    ));
    let sedex_processor = Arc::new(SedexMessageStateProcessor::new(
        state_store.clone(),
        full_sync.clone(),
        time_provider.clone(),
    ));

    // 8. Consumer worker pools
    let (stop_tx, stop_rx) = watch::channel(false);

    let transaction_workers = config
        .transaction_state_workers
        .clamp(MIN_TRANSACTION_STATE_WORKERS, MAX_TRANSACTION_STATE_WORKERS);
    info!(
        workers = transaction_workers,
        queue = QUEUE_TRANSACTION_STATE,
        "Starting transaction-state workers..."
    );
    let mut handles = spawn_worker_pool(
        Arc::new(StateQueueWorker::new(
            QUEUE_TRANSACTION_STATE,
            broker.clone(),
            transaction_processor.clone(),
        )),
        transaction_workers,
        &stop_rx,
    );

    info!(
        workers = config.sedex_state_workers,
        queue = QUEUE_SEDEX_STATE,
        "Starting sedex-state workers..."
    );
    handles.extend(spawn_worker_pool(
        Arc::new(StateQueueWorker::new(
            QUEUE_SEDEX_STATE,
            broker.clone(),
            sedex_processor,
        )),
        config.sedex_state_workers.max(1),
        &stop_rx,
    ));

    // 9. Periodic queue statistics for operators
    let stats_probe = QueueStatsProbe::new(broker.clone());
    let stats_interval = Duration::from_secs(config.stats_interval_secs.max(1));
    let mut stats_stop = stop_rx.clone();
    handles.push(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(stats_interval) => {
                    for queue in ALL_QUEUES {
                        match stats_probe.queue_count(queue).await {
                            Ok(count) => info!(queue = %queue, depth = count, "Queue depth"),
                            Err(e) => tracing::warn!(queue = %queue, error = %e, "Queue depth unavailable"),
                        }
                    }
                }
                _ = stats_stop.changed() => break,
            }
        }
    }));

    info!("System ready. Consuming state events...");
    info!("Press Ctrl+C to shutdown");

    // 10. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 11. Graceful shutdown: drain in-flight consumers
    let _ = stop_tx.send(true);
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete.");

    Ok(())
}
