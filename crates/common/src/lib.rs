//! Shared identifier types used across the allocation service.

pub mod types;

pub use types::{BatchRef, OrderId, Sku};
