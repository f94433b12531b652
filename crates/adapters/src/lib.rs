//! Persistence and notification adapters for the allocation service.
//!
//! The service layer talks to storage through two seams:
//! - [`ProductRepository`] — an identity map over `Product` aggregates with
//!   seen-tracking for event collection
//! - [`UnitOfWork`] / [`UnitOfWorkFactory`] — one atomic boundary per command
//!
//! Two implementations of each: PostgreSQL for deployments and an in-memory
//! variant that mirrors its behavior (including optimistic concurrency) for
//! tests and local runs.

pub mod error;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod repository;
pub mod unit_of_work;

pub use error::{AdapterError, Result};
pub use memory::{InMemoryRepository, InMemoryUnitOfWork, InMemoryUnitOfWorkFactory};
pub use notifications::{InMemoryNotificationSender, LoggingNotificationSender, NotificationSender};
pub use postgres::{
    DatabaseConfig, PostgresRepository, PostgresUnitOfWork, PostgresUnitOfWorkFactory,
};
pub use repository::ProductRepository;
pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};
