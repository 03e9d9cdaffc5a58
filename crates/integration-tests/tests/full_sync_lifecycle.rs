//! Full synchronization lifecycle: seeding, lazy job creation, failure
//! escalation and restart recovery, driven through the real broker and a
//! real SQLite store

use std::sync::Arc;

use lwgs_core::application::consumer::StateQueueWorker;
use lwgs_core::application::{FullSyncState, FullSyncStateManager, JobSeeder, TransactionStateProcessor};
use lwgs_core::config::SedexConfig;
use lwgs_core::domain::topology::*;
use lwgs_core::domain::{
    JobType, MessageCategory, MessageHeaders, SyncJobState, TransactionState,
};
use lwgs_core::port::id_provider::UuidProvider;
use lwgs_core::port::time_provider::SystemTimeProvider;
use lwgs_core::port::{
    MessageBroker, SettingRepository, StateStore, SyncJobRepository, TransactionRepository,
};
use lwgs_infra_broker::{declare_standard_topology, InMemoryBroker};
use lwgs_infra_sqlite::{
    create_pool, run_migrations, SqliteSettingRepository, SqliteStateStore,
    SqliteSyncJobRepository, SqliteTransactionRepository,
};

struct Harness {
    broker: Arc<InMemoryBroker>,
    seeder: JobSeeder,
    full_sync: Arc<FullSyncStateManager>,
    worker: StateQueueWorker,
    sync_jobs: SqliteSyncJobRepository,
    transactions: SqliteTransactionRepository,
}

async fn setup() -> Harness {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let broker = Arc::new(InMemoryBroker::new());
    declare_standard_topology(&broker).unwrap();

    let full_sync = Arc::new(FullSyncStateManager::new(Arc::new(UuidProvider)));
    let seeder = JobSeeder::new(
        broker.clone(),
        full_sync.clone(),
        SedexConfig::single("S1"),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    );

    let state_store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(pool.clone()));
    let processor = Arc::new(TransactionStateProcessor::new(
        state_store,
        full_sync.clone(),
        Arc::new(SystemTimeProvider),
    ));
    let worker = StateQueueWorker::new(QUEUE_TRANSACTION_STATE, broker.clone(), processor);

    Harness {
        broker,
        seeder,
        full_sync,
        worker,
        sync_jobs: SqliteSyncJobRepository::new(pool.clone()),
        transactions: SqliteTransactionRepository::new(pool),
    }
}

/// S3: full admission creates the sync job lazily when the NEW event is
/// consumed
#[tokio::test]
async fn test_full_admission_and_lazy_job_creation() {
    let h = setup().await;
    let job_id = h.full_sync.start_seeding().await.unwrap();

    let tx_id = h.seeder.seed_to_full("x", None).await.unwrap().unwrap();

    assert!(h.worker.process_next().await.unwrap());

    let job = h.sync_jobs.find_by_job_id(&job_id).await.unwrap().unwrap();
    assert_eq!(job.state, SyncJobState::New);
    assert_eq!(job.job_type, JobType::Full);

    let tx = h
        .transactions
        .find_by_transaction_id(&tx_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.state, TransactionState::New);
    assert_eq!(tx.job_id.as_deref(), Some(job_id.as_str()));

    // Ack happened after commit; nothing left on the queue
    assert_eq!(h.broker.queue_count(QUEUE_TRANSACTION_STATE).await.unwrap(), 0);
}

/// S4 through the wire: a FAILED transaction event escalates the job to
/// FAILED_PROCESSING and the lifecycle to FAILED
#[tokio::test]
async fn test_failure_escalation() {
    let h = setup().await;
    let job_id = h.full_sync.start_seeding().await.unwrap();
    let tx_id = h.seeder.seed_to_full("x", None).await.unwrap().unwrap();
    assert!(h.worker.process_next().await.unwrap());

    h.full_sync.submit_seeding().await.unwrap();

    // The pipeline reports the record failed
    let failed = MessageHeaders::builder()
        .sender_id("S1")
        .job_type(JobType::Full)
        .job_id(job_id.clone())
        .category(MessageCategory::TransactionEvent)
        .transaction_state(TransactionState::Failed)
        .transaction_id(tx_id.clone())
        .build();
    h.broker
        .publish(EXCHANGE_LWGS_STATE, QUEUE_FULL_FAILED, Vec::new(), &failed)
        .await
        .unwrap();
    assert!(h.worker.process_next().await.unwrap());

    let tx = h
        .transactions
        .find_by_transaction_id(&tx_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.state, TransactionState::Failed);

    let job = h.sync_jobs.find_by_job_id(&job_id).await.unwrap().unwrap();
    assert_eq!(job.state, SyncJobState::FailedProcessing);

    assert_eq!(h.full_sync.state().await, FullSyncState::Failed);
    h.full_sync.reset().await.unwrap();
    assert_eq!(h.full_sync.state().await, FullSyncState::Ready);
}

/// The seeded counter and lifecycle survive a process restart through the
/// settings table
#[tokio::test]
async fn test_lifecycle_survives_restart() {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let settings: Arc<dyn SettingRepository> = Arc::new(SqliteSettingRepository::new(pool.clone()));

    let manager = FullSyncStateManager::new(Arc::new(UuidProvider)).with_settings(settings.clone());
    let job_id = manager.start_seeding().await.unwrap();
    manager.inc_seed_counter().await.unwrap();
    manager.inc_seed_counter().await.unwrap();

    // Simulated restart: a fresh manager over the same database
    let restarted = FullSyncStateManager::new(Arc::new(UuidProvider)).with_settings(settings);
    restarted.restore().await.unwrap();

    assert_eq!(restarted.state().await, FullSyncState::Seeding);
    assert_eq!(restarted.current_job_id().await.unwrap(), job_id);
    assert_eq!(restarted.seed_counter().await, 2);
}
