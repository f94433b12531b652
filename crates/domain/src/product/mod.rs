//! Product aggregate and related types.

mod aggregate;
mod batch;
mod events;
mod value_objects;

pub use aggregate::Product;
pub use batch::Batch;
pub use events::{
    AllocationRequiredData, BatchCreatedData, BatchQuantityChangedData, Event, EventKind,
    OutOfStockData,
};
pub use value_objects::OrderLine;
