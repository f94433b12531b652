use common::Sku;
use thiserror::Error;

/// Errors that can occur in the persistence and notification adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Another writer committed the same product first.
    /// The baseline version no longer matches the stored version.
    #[error("Concurrency conflict for product {sku}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        sku: Sku,
        expected: u64,
        actual: u64,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back onto the domain model.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The unit of work was used after its transaction ended.
    #[error("Transaction already closed")]
    TransactionClosed,

    /// A notification could not be delivered.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
