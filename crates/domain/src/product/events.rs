//! Domain events for the allocation pipeline.
//!
//! Events are data only; behavior lives in the handlers registered on the
//! message bus. The set is closed: `EventKind` enumerates every kind so the
//! bus can verify at startup that each one has a handler.

use chrono::NaiveDate;
use common::{BatchRef, OrderId, Sku};
use serde::{Deserialize, Serialize};

/// Enumerable tag for every event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BatchCreated,
    AllocationRequired,
    BatchQuantityChanged,
    OutOfStock,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [EventKind; 4] = [
        EventKind::BatchCreated,
        EventKind::AllocationRequired,
        EventKind::BatchQuantityChanged,
        EventKind::OutOfStock,
    ];

    /// Returns the event kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BatchCreated => "BatchCreated",
            EventKind::AllocationRequired => "AllocationRequired",
            EventKind::BatchQuantityChanged => "BatchQuantityChanged",
            EventKind::OutOfStock => "OutOfStock",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that flow through the message bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// A new batch of stock was purchased.
    BatchCreated(BatchCreatedData),

    /// An order line needs to be allocated against a batch.
    AllocationRequired(AllocationRequiredData),

    /// The purchased quantity of an existing batch changed.
    BatchQuantityChanged(BatchQuantityChangedData),

    /// No batch could satisfy an order line.
    OutOfStock(OutOfStockData),
}

impl Event {
    /// Returns the kind tag for handler lookup.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BatchCreated(_) => EventKind::BatchCreated,
            Event::AllocationRequired(_) => EventKind::AllocationRequired,
            Event::BatchQuantityChanged(_) => EventKind::BatchQuantityChanged,
            Event::OutOfStock(_) => EventKind::OutOfStock,
        }
    }
}

/// Data for a BatchCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCreatedData {
    /// Reference of the new batch.
    pub reference: BatchRef,

    /// Sku the batch supplies.
    pub sku: Sku,

    /// Purchased quantity.
    pub qty: u32,

    /// Estimated arrival date; `None` for warehouse stock.
    pub eta: Option<NaiveDate>,
}

/// Data for an AllocationRequired event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequiredData {
    /// The order the line belongs to.
    pub order_id: OrderId,

    /// The product being ordered.
    pub sku: Sku,

    /// Units requested.
    pub qty: u32,
}

/// Data for a BatchQuantityChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQuantityChangedData {
    /// Reference of the affected batch.
    pub reference: BatchRef,

    /// The new purchased quantity.
    pub qty: u32,
}

/// Data for an OutOfStock event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStockData {
    /// The sku that ran out.
    pub sku: Sku,
}

// Convenience constructors
impl Event {
    /// Creates a BatchCreated event.
    pub fn batch_created(
        reference: impl Into<BatchRef>,
        sku: impl Into<Sku>,
        qty: u32,
        eta: Option<NaiveDate>,
    ) -> Self {
        Event::BatchCreated(BatchCreatedData {
            reference: reference.into(),
            sku: sku.into(),
            qty,
            eta,
        })
    }

    /// Creates an AllocationRequired event.
    pub fn allocation_required(
        order_id: impl Into<OrderId>,
        sku: impl Into<Sku>,
        qty: u32,
    ) -> Self {
        Event::AllocationRequired(AllocationRequiredData {
            order_id: order_id.into(),
            sku: sku.into(),
            qty,
        })
    }

    /// Creates a BatchQuantityChanged event.
    pub fn batch_quantity_changed(reference: impl Into<BatchRef>, qty: u32) -> Self {
        Event::BatchQuantityChanged(BatchQuantityChangedData {
            reference: reference.into(),
            qty,
        })
    }

    /// Creates an OutOfStock event.
    pub fn out_of_stock(sku: impl Into<Sku>) -> Self {
        Event::OutOfStock(OutOfStockData { sku: sku.into() })
    }
}
