use adapters::AdapterError;
use common::{BatchRef, Sku};
use domain::EventKind;
use thiserror::Error;

/// Errors raised by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An allocation was requested for a sku nobody sells.
    #[error("Invalid sku {sku}")]
    InvalidSku { sku: Sku },

    /// A quantity change referenced a batch that does not exist.
    #[error("Invalid batch reference {reference}")]
    InvalidBatchReference { reference: BatchRef },

    /// An order line arrived with a quantity the domain rejects.
    #[error("Invalid quantity {qty}: must be greater than zero")]
    InvalidQuantity { qty: u32 },

    /// The message bus was built without a handler for some event kind.
    #[error("No handler registered for event kind {kind}")]
    MissingHandler { kind: EventKind },

    /// A handler was invoked with an event variant it does not accept.
    #[error("Handler expected {expected} event, got {actual}")]
    MismatchedEvent {
        expected: EventKind,
        actual: EventKind,
    },

    /// Event handling cascaded past the safety limit.
    #[error("Event cascade exceeded {limit} events")]
    CascadeLimitExceeded { limit: usize },

    /// A persistence or notification adapter failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
