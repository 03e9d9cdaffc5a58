// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod message_broker;
pub mod sedex_message_repository;
pub mod setting_repository;
pub mod state_store;
pub mod sync_job_repository;
pub mod time_provider;
pub mod transaction_repository;

// Re-exports
pub use id_provider::IdProvider;
pub use message_broker::{Delivery, MessageBroker};
pub use sedex_message_repository::SedexMessageRepository;
pub use setting_repository::SettingRepository;
pub use state_store::{StateStore, StateUnit};
pub use sync_job_repository::SyncJobRepository;
pub use time_provider::TimeProvider;
pub use transaction_repository::TransactionRepository;
