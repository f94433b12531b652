//! Batch entity: one purchased lot of stock for a single sku.

use std::collections::HashSet;

use chrono::NaiveDate;
use common::{BatchRef, Sku};
use serde::{Deserialize, Serialize};

use super::OrderLine;

/// A batch of stock ordered by the purchasing department.
///
/// Identity is the batch reference, not the contents: two batches with the
/// same reference are the same batch regardless of quantities. An `eta` of
/// `None` means the stock is already in the warehouse; `Option<NaiveDate>`'s
/// natural ordering (`None` before any date) is exactly the allocation
/// preference order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    reference: BatchRef,
    sku: Sku,
    eta: Option<NaiveDate>,
    purchased_quantity: u32,
    allocations: HashSet<OrderLine>,
}

impl Batch {
    /// Creates a new batch with no allocations.
    pub fn new(
        reference: impl Into<BatchRef>,
        sku: impl Into<Sku>,
        qty: u32,
        eta: Option<NaiveDate>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            eta,
            purchased_quantity: qty,
            allocations: HashSet::new(),
        }
    }

    /// Returns the batch reference.
    pub fn reference(&self) -> &BatchRef {
        &self.reference
    }

    /// Returns the sku this batch supplies.
    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Returns the estimated arrival date, or `None` for warehouse stock.
    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    /// Returns the purchased quantity.
    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    /// Returns the order lines currently allocated to this batch.
    pub fn allocations(&self) -> impl Iterator<Item = &OrderLine> {
        self.allocations.iter()
    }

    /// Total quantity already allocated to order lines.
    pub fn allocated_quantity(&self) -> u32 {
        self.allocations.iter().map(|line| line.qty).sum()
    }

    /// Remaining capacity.
    ///
    /// Signed: a quantity change can leave the batch transiently
    /// over-allocated until the owning product deallocates the excess.
    pub fn available_quantity(&self) -> i64 {
        i64::from(self.purchased_quantity) - i64::from(self.allocated_quantity())
    }

    /// Returns true when this batch can supply the given line.
    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == line.sku && self.available_quantity() >= i64::from(line.qty)
    }

    /// Allocates the line to this batch if [`Self::can_allocate`] holds.
    ///
    /// Otherwise a silent no-op: re-allocating an already-satisfied line must
    /// not corrupt state, so the caller is free to retry idempotently.
    pub fn allocate(&mut self, line: OrderLine) {
        if self.can_allocate(&line) {
            self.allocations.insert(line);
        }
    }

    /// Removes the line from this batch if allocated; no-op otherwise.
    pub fn deallocate(&mut self, line: &OrderLine) {
        self.allocations.remove(line);
    }

    /// Restores a persisted allocation without capacity gating.
    ///
    /// For persistence adapters rehydrating an aggregate; not part of the
    /// command surface.
    pub fn restore_allocation(&mut self, line: OrderLine) {
        self.allocations.insert(line);
    }

    pub(crate) fn set_purchased_quantity(&mut self, qty: u32) {
        self.purchased_quantity = qty;
    }

    /// Removes and returns an arbitrary allocated line.
    pub(crate) fn deallocate_one(&mut self) -> Option<OrderLine> {
        let line = self.allocations.iter().next().cloned()?;
        self.allocations.remove(&line);
        Some(line)
    }
}

// Identity is the reference; see struct docs.
impl PartialEq for Batch {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Eq for Batch {}

impl std::hash::Hash for Batch {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.reference.hash(state);
    }
}
