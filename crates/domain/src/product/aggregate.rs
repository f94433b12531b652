//! Product aggregate root.

use common::{BatchRef, Sku};
use serde::{Deserialize, Serialize};

use crate::error::ProductError;

use super::{Batch, Event, OrderLine};

/// Aggregate root for all stock of one sku.
///
/// The product owns its batches outright: handlers mutate batches only
/// through product methods, never directly. Every batch shares the product's
/// sku (enforced where batches are constructed, at the handler level).
///
/// `version_number` increments by exactly one per successful allocation and
/// never otherwise; persistence adapters use it as a compare-and-swap token
/// to detect lost updates between concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    sku: Sku,
    batches: Vec<Batch>,
    version_number: u64,
    #[serde(skip)]
    events: Vec<Event>,
}

impl Product {
    /// Creates a product with no batches at version 0.
    pub fn new(sku: impl Into<Sku>) -> Self {
        Self {
            sku: sku.into(),
            batches: Vec::new(),
            version_number: 0,
            events: Vec::new(),
        }
    }

    /// Rebuilds a persisted product at a known version.
    ///
    /// For persistence adapters; the pending-event queue starts empty.
    pub fn restore(sku: impl Into<Sku>, batches: Vec<Batch>, version_number: u64) -> Self {
        Self {
            sku: sku.into(),
            batches,
            version_number,
            events: Vec::new(),
        }
    }

    /// Returns the product's sku.
    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Returns the current optimistic-concurrency version.
    pub fn version_number(&self) -> u64 {
        self.version_number
    }

    /// Returns the batches owned by this product.
    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    /// Returns a batch by reference.
    pub fn batch(&self, reference: &BatchRef) -> Option<&Batch> {
        self.batches.iter().find(|b| b.reference() == reference)
    }

    /// Returns true if any events are waiting to be collected.
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Drains the pending-event queue in the order events were recorded.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Appends a batch to the product.
    pub fn add_batch(&mut self, batch: Batch) {
        self.batches.push(batch);
    }

    /// Allocates an order line to the best candidate batch.
    ///
    /// Warehouse stock (no eta) is preferred over any shipment; among
    /// shipments the earliest eta wins. On success the chosen batch absorbs
    /// the line, the version counter bumps by one, and the batch reference is
    /// returned. When no batch can satisfy the line, an `OutOfStock` event is
    /// recorded instead and `None` is returned; the version is untouched.
    pub fn allocate(&mut self, line: &OrderLine) -> Option<BatchRef> {
        // Stable sort keeps insertion order between batches with equal etas;
        // Option<NaiveDate> already orders None before any date.
        let mut preference: Vec<usize> = (0..self.batches.len()).collect();
        preference.sort_by_key(|&i| self.batches[i].eta());

        match preference
            .into_iter()
            .find(|&i| self.batches[i].can_allocate(line))
        {
            Some(i) => {
                self.batches[i].allocate(line.clone());
                self.version_number += 1;
                Some(self.batches[i].reference().clone())
            }
            None => {
                self.events.push(Event::out_of_stock(self.sku.clone()));
                None
            }
        }
    }

    /// Changes a batch's purchased quantity, deallocating any excess lines.
    ///
    /// Each deallocated line is re-submitted as an `AllocationRequired` event
    /// with its original order id, sku and quantity, so the allocation
    /// algorithm re-runs it against the remaining batches in the same
    /// cascade.
    pub fn change_batch_quantity(
        &mut self,
        reference: &BatchRef,
        qty: u32,
    ) -> Result<(), ProductError> {
        let batch = self
            .batches
            .iter_mut()
            .find(|b| b.reference() == reference)
            .ok_or_else(|| ProductError::UnknownBatch {
                sku: self.sku.clone(),
                reference: reference.clone(),
            })?;

        batch.set_purchased_quantity(qty);
        while batch.available_quantity() < 0 {
            let Some(line) = batch.deallocate_one() else {
                break;
            };
            self.events
                .push(Event::allocation_required(line.order_id, line.sku, line.qty));
        }
        Ok(())
    }
}
