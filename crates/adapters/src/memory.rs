//! In-memory repository and unit of work for testing.
//!
//! Behaves like the PostgreSQL implementation, including optimistic
//! concurrency: a factory-backed unit of work records the version of every
//! product it loads and refuses to commit over a concurrent change.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{BatchRef, Sku};
use domain::{Event, Product};
use tokio::sync::RwLock;

use crate::error::{AdapterError, Result};
use crate::repository::ProductRepository;
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

type SharedStore = Arc<RwLock<HashMap<Sku, Product>>>;

/// In-memory product repository.
///
/// An identity map over a store of committed products: products clone in
/// lazily on first access and write back on flush, exactly like the Postgres
/// repository does with rows. The store is private by default and shared
/// when handed out by [`InMemoryUnitOfWorkFactory`].
pub struct InMemoryRepository {
    store: SharedStore,
    loaded: HashMap<Sku, Product>,
    baselines: HashMap<Sku, u64>,
    fresh: HashSet<Sku>,
    seen: Vec<Sku>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::backed_by(SharedStore::default())
    }
}

impl InMemoryRepository {
    /// Creates a repository over its own private store.
    pub fn new() -> Self {
        Self::default()
    }

    fn backed_by(store: SharedStore) -> Self {
        Self {
            store,
            loaded: HashMap::new(),
            baselines: HashMap::new(),
            fresh: HashSet::new(),
            seen: Vec::new(),
        }
    }

    fn mark_seen(&mut self, sku: &Sku) {
        if !self.seen.contains(sku) {
            self.seen.push(sku.clone());
        }
    }

    async fn ensure_loaded(&mut self, sku: &Sku) {
        if !self.loaded.contains_key(sku) {
            let guard = self.store.read().await;
            if let Some(product) = guard.get(sku) {
                self.baselines.insert(sku.clone(), product.version_number());
                self.loaded.insert(sku.clone(), product.clone());
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        let mut guard = self.store.write().await;
        for sku in &self.seen {
            let Some(product) = self.loaded.get(sku) else {
                continue;
            };
            if !self.fresh.contains(sku)
                && let Some(stored) = guard.get(sku)
            {
                let baseline = self.baselines.get(sku).copied().unwrap_or(0);
                if stored.version_number() != baseline {
                    return Err(AdapterError::ConcurrencyConflict {
                        sku: sku.clone(),
                        expected: baseline,
                        actual: stored.version_number(),
                    });
                }
            }
            // Store a copy without the pending-event queue; events are
            // delivered through this unit of work, not a later one.
            let snapshot = Product::restore(
                product.sku().clone(),
                product.batches().cloned().collect(),
                product.version_number(),
            );
            guard.insert(sku.clone(), snapshot);
        }
        drop(guard);
        for sku in &self.seen {
            if let Some(product) = self.loaded.get(sku) {
                self.baselines.insert(sku.clone(), product.version_number());
            }
        }
        self.fresh.clear();
        Ok(())
    }

    fn discard(&mut self) {
        self.loaded.clear();
        self.baselines.clear();
        self.fresh.clear();
        self.seen.clear();
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository {
    async fn add(&mut self, product: Product) -> Result<()> {
        let sku = product.sku().clone();
        self.fresh.insert(sku.clone());
        self.loaded.insert(sku.clone(), product);
        self.mark_seen(&sku);
        Ok(())
    }

    async fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>> {
        self.ensure_loaded(sku).await;
        if self.loaded.contains_key(sku) {
            self.mark_seen(sku);
        }
        Ok(self.loaded.get_mut(sku))
    }

    async fn get_by_batch_ref(&mut self, reference: &BatchRef) -> Result<Option<&mut Product>> {
        let mut owner = self
            .loaded
            .iter()
            .find_map(|(sku, product)| product.batch(reference).map(|_| sku.clone()));
        if owner.is_none() {
            let guard = self.store.read().await;
            owner = guard
                .iter()
                .find_map(|(sku, product)| product.batch(reference).map(|_| sku.clone()));
        }
        match owner {
            Some(sku) => self.get(&sku).await,
            None => Ok(None),
        }
    }

    fn collect_new_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        for sku in &self.seen {
            if let Some(product) = self.loaded.get_mut(sku) {
                events.extend(product.drain_events());
            }
        }
        events
    }
}

/// In-memory unit of work.
///
/// The standalone form (`new`) owns a private store and tracks whether
/// `commit` was called, which is all handler tests need. The factory-backed
/// form shares a store between units of work; both enforce the version check
/// on commit.
#[derive(Default)]
pub struct InMemoryUnitOfWork {
    repo: InMemoryRepository,
    committed: bool,
}

impl InMemoryUnitOfWork {
    /// Creates a standalone unit of work over a private store.
    pub fn new() -> Self {
        Self::default()
    }

    fn backed_by(store: SharedStore) -> Self {
        Self {
            repo: InMemoryRepository::backed_by(store),
            committed: false,
        }
    }

    /// Returns true once `commit` has succeeded at least once.
    pub fn committed(&self) -> bool {
        self.committed
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Repo = InMemoryRepository;

    fn products(&mut self) -> &mut InMemoryRepository {
        &mut self.repo
    }

    async fn commit(&mut self) -> Result<()> {
        self.repo.flush().await?;
        self.committed = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.repo.discard();
        Ok(())
    }
}

/// Factory handing out units of work over one shared in-memory store.
#[derive(Clone, Default)]
pub struct InMemoryUnitOfWorkFactory {
    store: SharedStore,
}

impl InMemoryUnitOfWorkFactory {
    /// Creates a factory with an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<InMemoryUnitOfWork> {
        Ok(InMemoryUnitOfWork::backed_by(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Batch, OrderLine};

    #[tokio::test]
    async fn get_returns_the_same_instance_it_added() {
        let mut uow = InMemoryUnitOfWork::new();
        uow.products().add(Product::new("LAMP")).await.unwrap();

        let product = uow.products().get(&"LAMP".into()).await.unwrap().unwrap();
        product.add_batch(Batch::new("b1", "LAMP", 10, None));

        let product = uow.products().get(&"LAMP".into()).await.unwrap().unwrap();
        assert!(product.batch(&"b1".into()).is_some());
    }

    #[tokio::test]
    async fn get_by_batch_ref_finds_the_owning_product() {
        let mut uow = InMemoryUnitOfWork::new();
        let mut product = Product::new("LAMP");
        product.add_batch(Batch::new("b1", "LAMP", 10, None));
        uow.products().add(product).await.unwrap();

        let found = uow.products().get_by_batch_ref(&"b1".into()).await.unwrap();
        assert_eq!(found.unwrap().sku(), &"LAMP".into());

        let missing = uow
            .products()
            .get_by_batch_ref(&"nope".into())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn collect_new_events_drains_in_seen_order() {
        let mut uow = InMemoryUnitOfWork::new();
        uow.products().add(Product::new("LAMP")).await.unwrap();
        uow.products().add(Product::new("CHAIR")).await.unwrap();

        // Out-of-stock on both products, in reverse seen order.
        let chair = uow.products().get(&"CHAIR".into()).await.unwrap().unwrap();
        chair.allocate(&OrderLine::new("CHAIR", "o1", 1));
        let lamp = uow.products().get(&"LAMP".into()).await.unwrap().unwrap();
        lamp.allocate(&OrderLine::new("LAMP", "o2", 1));

        let events = uow.collect_new_events();
        assert_eq!(
            events,
            vec![Event::out_of_stock("LAMP"), Event::out_of_stock("CHAIR")]
        );
        assert!(uow.collect_new_events().is_empty());
    }

    #[tokio::test]
    async fn factory_backed_commit_publishes_to_the_shared_store() {
        let factory = InMemoryUnitOfWorkFactory::new();

        let mut uow = factory.begin().await.unwrap();
        let mut product = Product::new("LAMP");
        product.add_batch(Batch::new("b1", "LAMP", 10, None));
        uow.products().add(product).await.unwrap();
        uow.commit().await.unwrap();

        let mut other = factory.begin().await.unwrap();
        let loaded = other.products().get(&"LAMP".into()).await.unwrap().unwrap();
        assert!(loaded.batch(&"b1".into()).is_some());
    }

    #[tokio::test]
    async fn uncommitted_changes_never_reach_the_shared_store() {
        let factory = InMemoryUnitOfWorkFactory::new();

        let mut uow = factory.begin().await.unwrap();
        uow.products().add(Product::new("LAMP")).await.unwrap();
        drop(uow);

        let mut other = factory.begin().await.unwrap();
        assert!(other.products().get(&"LAMP".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_commits_conflict_on_version() {
        let factory = InMemoryUnitOfWorkFactory::new();

        let mut setup = factory.begin().await.unwrap();
        let mut product = Product::new("LAMP");
        product.add_batch(Batch::new("b1", "LAMP", 100, None));
        setup.products().add(product).await.unwrap();
        setup.commit().await.unwrap();

        let mut first = factory.begin().await.unwrap();
        let mut second = factory.begin().await.unwrap();
        first
            .products()
            .get(&"LAMP".into())
            .await
            .unwrap()
            .unwrap()
            .allocate(&OrderLine::new("LAMP", "o1", 1));
        second
            .products()
            .get(&"LAMP".into())
            .await
            .unwrap()
            .unwrap()
            .allocate(&OrderLine::new("LAMP", "o2", 1));

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, AdapterError::ConcurrencyConflict { .. }));
    }

    #[tokio::test]
    async fn rollback_discards_loaded_state() {
        let mut uow = InMemoryUnitOfWork::new();
        uow.products().add(Product::new("LAMP")).await.unwrap();
        uow.rollback().await.unwrap();

        assert!(uow.products().get(&"LAMP".into()).await.unwrap().is_none());
        assert!(!uow.committed());
    }
}
