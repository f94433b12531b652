//! Value objects for the allocation domain.

use common::{OrderId, Sku};
use serde::{Deserialize, Serialize};

/// A customer's requested quantity of one sku for one order.
///
/// Order lines are pure values: equality and hashing are structural over all
/// three fields, and two lines for the same order, sku and quantity are
/// indistinguishable. A line always carries a positive quantity: `new`
/// debug-asserts it, and the service boundary rejects zero before a line is
/// ever built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product being ordered.
    pub sku: Sku,

    /// The order this line belongs to.
    pub order_id: OrderId,

    /// Number of units requested.
    pub qty: u32,
}

impl OrderLine {
    /// Creates a new order line. The quantity must be positive.
    pub fn new(sku: impl Into<Sku>, order_id: impl Into<OrderId>, qty: u32) -> Self {
        debug_assert!(qty > 0, "order line quantity must be positive");
        Self {
            sku: sku.into(),
            order_id: order_id.into(),
            qty,
        }
    }
}
