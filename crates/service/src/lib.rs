//! Service layer for the allocation system.
//!
//! Commands arrive as domain events; the [`MessageBus`] routes each one to
//! its handler, which opens the aggregate through a unit of work, mutates it
//! and commits. Events the aggregates raise along the way (out-of-stock,
//! reallocation requests) feed back into the same bus run.

pub mod error;
pub mod handlers;
pub mod messagebus;

pub use error::{Result, ServiceError};
pub use handlers::{
    AddBatchHandler, AllocateHandler, ChangeBatchQuantityHandler, EventHandler,
    OutOfStockNotificationHandler,
};
pub use messagebus::{MessageBus, MessageBusBuilder};
