// Application Layer - Processors and Use Cases

pub mod consumer;
pub mod full_sync;
pub mod queue_stats;
pub mod sedex_processor;
pub mod seeder;
pub mod transaction_processor;

// Re-exports
pub use consumer::{spawn_worker_pool, StateEventHandler, StateQueueWorker};
pub use full_sync::{FullSyncState, FullSyncStateManager};
pub use queue_stats::QueueStatsProbe;
pub use sedex_processor::SedexMessageStateProcessor;
pub use seeder::JobSeeder;
pub use transaction_processor::TransactionStateProcessor;
