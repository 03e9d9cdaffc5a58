// LWGS Infrastructure - SQLite Adapter
// Implements: SettingRepository, TransactionRepository, SyncJobRepository,
// SedexMessageRepository and the per-message StateStore unit of work

mod connection;
mod migration;
mod rows;
mod sedex_message_repository;
mod setting_repository;
mod sqlx_error;
mod state_store;
mod sync_job_repository;
mod transaction_repository;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use sedex_message_repository::SqliteSedexMessageRepository;
pub use setting_repository::SqliteSettingRepository;
pub use state_store::SqliteStateStore;
pub use sync_job_repository::SqliteSyncJobRepository;
pub use transaction_repository::SqliteTransactionRepository;
