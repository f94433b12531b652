//! Domain error types.

use common::{BatchRef, Sku};
use thiserror::Error;

/// No batch can satisfy an order line.
///
/// Only the standalone [`crate::allocate`] helper raises this; the
/// [`crate::Product`] aggregate records an `OutOfStock` event instead so a
/// failed allocation does not unwind the enclosing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Out of stock for sku {sku}")]
pub struct OutOfStockError {
    pub sku: Sku,
}

/// Errors raised by [`crate::Product`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// A quantity change referenced a batch the product does not own.
    #[error("batch {reference} does not belong to product {sku}")]
    UnknownBatch { sku: Sku, reference: BatchRef },
}
