//! Repository abstraction over product storage.

use async_trait::async_trait;
use common::{BatchRef, Sku};
use domain::{Event, Product};

use crate::error::Result;

/// Storage for [`Product`] aggregates.
///
/// Implementations act as an identity map for the lifetime of one unit of
/// work: repeated `get` calls for the same sku return the same in-memory
/// instance, so mutations accumulate on it until commit. The repository also
/// tracks every aggregate it has handed out ("seen"), which is how pending
/// domain events find their way back to the message bus.
#[async_trait]
pub trait ProductRepository: Send {
    /// Registers a brand-new product with the unit of work.
    async fn add(&mut self, product: Product) -> Result<()>;

    /// Fetches a product by sku, loading it from the backing store on first
    /// access.
    async fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>>;

    /// Fetches the product owning the batch with the given reference.
    async fn get_by_batch_ref(&mut self, reference: &BatchRef) -> Result<Option<&mut Product>>;

    /// Drains pending events from every seen aggregate, in the order the
    /// aggregates were first seen.
    fn collect_new_events(&mut self) -> Vec<Event>;
}
