// Domain Layer - Pure business logic and entities

pub mod error;
pub mod headers;
pub mod sedex_message;
pub mod setting;
pub mod sync_job;
pub mod topology;
pub mod transaction;

// Re-exports
pub use error::DomainError;
pub use headers::{
    JobType, MessageCategory, MessageHeaders, MessageHeadersBuilder, PersonDataRecord,
    TransactionState,
};
pub use sedex_message::{SedexMessage, SedexMessageState};
pub use setting::Setting;
pub use sync_job::{SyncJob, SyncJobState};
pub use transaction::Transaction;
