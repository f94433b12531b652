//! Unit-of-work abstraction: one atomic boundary per command.

use async_trait::async_trait;
use domain::Event;

use crate::error::Result;
use crate::repository::ProductRepository;

/// An atomic unit of work over the product store.
///
/// Handlers mutate aggregates through [`Self::products`] and then call
/// [`Self::commit`]; nothing reaches the backing store before commit, and a
/// dropped or rolled-back unit of work leaves the store untouched. After a
/// commit the unit of work is reusable: implementations start a fresh
/// transaction so cascaded events can be handled on the same instance.
#[async_trait]
pub trait UnitOfWork: Send {
    type Repo: ProductRepository;

    /// The repository scoped to this unit of work.
    fn products(&mut self) -> &mut Self::Repo;

    /// Atomically persists every change made through [`Self::products`].
    async fn commit(&mut self) -> Result<()>;

    /// Discards every uncommitted change.
    async fn rollback(&mut self) -> Result<()>;

    /// Drains pending domain events from all aggregates this unit of work
    /// has touched. Survives commit: events raised before a commit are still
    /// collectable afterwards.
    fn collect_new_events(&mut self) -> Vec<Event> {
        self.products().collect_new_events()
    }
}

/// Produces fresh units of work, one per incoming command.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    type Uow: UnitOfWork;

    /// Begins a new unit of work.
    async fn begin(&self) -> Result<Self::Uow>;
}
