//! Domain model for the stock allocation service.
//!
//! This crate provides the core domain concepts:
//! - `OrderLine` value object describing a customer's request
//! - `Batch` entity tracking one purchased lot of stock
//! - `Product` aggregate root owning the allocation algorithm and its
//!   optimistic-concurrency version counter
//! - The closed set of domain events that drive the service layer
//! - A standalone list-based `allocate` helper

pub mod allocation;
pub mod error;
pub mod product;

pub use allocation::allocate;
pub use error::{OutOfStockError, ProductError};
pub use product::{
    AllocationRequiredData, Batch, BatchCreatedData, BatchQuantityChangedData, Event, EventKind,
    OrderLine, OutOfStockData, Product,
};
