// Transaction Repository Port (Interface)

use crate::domain::Transaction;
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Transaction persistence
///
/// `insert` must surface a unique-key clash on `transaction_id` as
/// `AppError::DataIntegrityViolation` so consumers can detect redelivery
/// races.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert a new transaction
    async fn insert(&self, transaction: &Transaction) -> Result<()>;

    /// Find transaction by its natural key
    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Transaction>>;

    /// Update an existing transaction
    async fn update(&self, transaction: &Transaction) -> Result<()>;
}
