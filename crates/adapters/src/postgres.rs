//! PostgreSQL repository and unit of work.
//!
//! Each unit of work owns one database transaction. Products load lazily
//! into an identity map and write back on commit; lost updates between
//! concurrent writers surface as [`AdapterError::ConcurrencyConflict`] via a
//! compare-and-swap on the product's version column.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BatchRef, Sku};
use domain::{Batch, Event, OrderLine, Product};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::error::{AdapterError, Result};
use crate::repository::ProductRepository;
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Connection settings for the PostgreSQL backend.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Creates a config with the default pool size.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
        }
    }
}

fn version_to_db(version: u64) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| AdapterError::Decode(format!("version {version} exceeds storage range")))
}

fn version_from_db(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| AdapterError::Decode(format!("negative stored version {value}")))
}

fn qty_to_db(qty: u32) -> Result<i32> {
    i32::try_from(qty)
        .map_err(|_| AdapterError::Decode(format!("quantity {qty} exceeds storage range")))
}

fn qty_from_db(value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| AdapterError::Decode(format!("negative stored quantity {value}")))
}

/// Product repository bound to one PostgreSQL transaction.
pub struct PostgresRepository {
    tx: Option<Transaction<'static, Postgres>>,
    loaded: HashMap<Sku, Product>,
    baselines: HashMap<Sku, u64>,
    fresh: HashSet<Sku>,
    seen: Vec<Sku>,
}

impl PostgresRepository {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Some(tx),
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

    fn discard(&mut self) {
        self.loaded.clear();
        self.baselines.clear();
        self.fresh.clear();
        self.seen.clear();
    }

    async fn fetch(&mut self, sku: &Sku) -> Result<Option<Product>> {
        let tx = self.tx.as_mut().ok_or(AdapterError::TransactionClosed)?;

        let product_row = sqlx::query("SELECT version_number FROM products WHERE sku = $1")
            .bind(sku.as_str())
            .fetch_optional(&mut **tx)
            .await?;
        let Some(product_row) = product_row else {
            return Ok(None);
        };
        let version = version_from_db(product_row.try_get("version_number")?)?;

        // Batch order is insertion order; allocation preference relies on it
        // as the tie-break between equal etas.
        let batch_rows = sqlx::query(
            "SELECT reference, purchased_quantity, eta FROM batches WHERE sku = $1 ORDER BY id",
        )
        .bind(sku.as_str())
        .fetch_all(&mut **tx)
        .await?;

        let mut batches = Vec::with_capacity(batch_rows.len());
        let mut index = HashMap::new();
        for row in batch_rows {
            let reference: String = row.try_get("reference")?;
            let qty = qty_from_db(row.try_get("purchased_quantity")?)?;
            let eta: Option<NaiveDate> = row.try_get("eta")?;
            index.insert(reference.clone(), batches.len());
            batches.push(Batch::new(reference, sku.clone(), qty, eta));
        }

        let alloc_rows = sqlx::query(
            "SELECT a.batch_reference, a.order_id, a.sku, a.qty \
             FROM allocations a \
             JOIN batches b ON a.batch_reference = b.reference \
             WHERE b.sku = $1",
        )
        .bind(sku.as_str())
        .fetch_all(&mut **tx)
        .await?;
        for row in alloc_rows {
            let reference: String = row.try_get("batch_reference")?;
            let order_id: String = row.try_get("order_id")?;
            let line_sku: String = row.try_get("sku")?;
            let qty = qty_from_db(row.try_get("qty")?)?;
            let Some(&i) = index.get(&reference) else {
                return Err(AdapterError::Decode(format!(
                    "allocation references unknown batch {reference}"
                )));
            };
            batches[i].restore_allocation(OrderLine::new(line_sku, order_id, qty));
        }

        Ok(Some(Product::restore(sku.clone(), batches, version)))
    }

    async fn flush(&mut self) -> Result<()> {
        let Self {
            tx,
            loaded,
            baselines,
            fresh,
            seen,
        } = self;
        let tx = tx.as_mut().ok_or(AdapterError::TransactionClosed)?;

        for sku in seen.iter() {
            let Some(product) = loaded.get(sku) else {
                continue;
            };
            let version = version_to_db(product.version_number())?;

            if fresh.contains(sku) {
                sqlx::query("INSERT INTO products (sku, version_number) VALUES ($1, $2)")
                    .bind(sku.as_str())
                    .bind(version)
                    .execute(&mut **tx)
                    .await?;
            } else {
                let baseline = baselines.get(sku).copied().unwrap_or(0);
                let updated = sqlx::query(
                    "UPDATE products SET version_number = $1 \
                     WHERE sku = $2 AND version_number = $3",
                )
                .bind(version)
                .bind(sku.as_str())
                .bind(version_to_db(baseline)?)
                .execute(&mut **tx)
                .await?;
                if updated.rows_affected() == 0 {
                    let actual = sqlx::query("SELECT version_number FROM products WHERE sku = $1")
                        .bind(sku.as_str())
                        .fetch_optional(&mut **tx)
                        .await?
                        .map(|row| row.try_get::<i64, _>("version_number"))
                        .transpose()?
                        .map(version_from_db)
                        .transpose()?
                        .unwrap_or(0);
                    return Err(AdapterError::ConcurrencyConflict {
                        sku: sku.clone(),
                        expected: baseline,
                        actual,
                    });
                }
            }

            for batch in product.batches() {
                sqlx::query(
                    "INSERT INTO batches (reference, sku, purchased_quantity, eta) \
                     VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (reference) \
                     DO UPDATE SET purchased_quantity = EXCLUDED.purchased_quantity",
                )
                .bind(batch.reference().as_str())
                .bind(sku.as_str())
                .bind(qty_to_db(batch.purchased_quantity())?)
                .bind(batch.eta())
                .execute(&mut **tx)
                .await?;

                sqlx::query("DELETE FROM allocations WHERE batch_reference = $1")
                    .bind(batch.reference().as_str())
                    .execute(&mut **tx)
                    .await?;
                for line in batch.allocations() {
                    sqlx::query(
                        "INSERT INTO allocations (batch_reference, order_id, sku, qty) \
                         VALUES ($1, $2, $3, $4)",
                    )
                    .bind(batch.reference().as_str())
                    .bind(line.order_id.as_str())
                    .bind(line.sku.as_str())
                    .bind(qty_to_db(line.qty)?)
                    .execute(&mut **tx)
                    .await?;
                }
            }

            baselines.insert(sku.clone(), product.version_number());
        }

        fresh.clear();
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PostgresRepository {
    async fn add(&mut self, product: Product) -> Result<()> {
        let sku = product.sku().clone();
        self.fresh.insert(sku.clone());
        self.loaded.insert(sku.clone(), product);
        self.mark_seen(&sku);
        Ok(())
    }

    async fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>> {
        if !self.loaded.contains_key(sku) {
            match self.fetch(sku).await? {
                Some(product) => {
                    self.baselines.insert(sku.clone(), product.version_number());
                    self.loaded.insert(sku.clone(), product);
                }
                None => return Ok(None),
            }
        }
        self.mark_seen(sku);
        Ok(self.loaded.get_mut(sku))
    }

    async fn get_by_batch_ref(&mut self, reference: &BatchRef) -> Result<Option<&mut Product>> {
        let owner = self
            .loaded
            .iter()
            .find_map(|(sku, product)| product.batch(reference).map(|_| sku.clone()));
        let owner = match owner {
            Some(sku) => Some(sku),
            None => {
                let tx = self.tx.as_mut().ok_or(AdapterError::TransactionClosed)?;
                sqlx::query("SELECT sku FROM batches WHERE reference = $1")
                    .bind(reference.as_str())
                    .fetch_optional(&mut **tx)
                    .await?
                    .map(|row| row.try_get::<String, _>("sku"))
                    .transpose()?
                    .map(Sku::from)
            }
        };
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

/// Unit of work over one PostgreSQL transaction.
///
/// Commit flushes the identity map inside the transaction and then commits
/// it; a fresh transaction is opened immediately so cascaded events can keep
/// working on the same instance.
pub struct PostgresUnitOfWork {
    pool: PgPool,
    repo: PostgresRepository,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Repo = PostgresRepository;

    fn products(&mut self) -> &mut PostgresRepository {
        &mut self.repo
    }

    #[tracing::instrument(skip(self))]
    async fn commit(&mut self) -> Result<()> {
        self.repo.flush().await?;
        let tx = self.repo.tx.take().ok_or(AdapterError::TransactionClosed)?;
        tx.commit().await?;
        self.repo.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.repo.tx.take() {
            tx.rollback().await?;
        }
        self.repo.discard();
        self.repo.tx = Some(self.pool.begin().await?);
        Ok(())
    }
}

/// Factory handing out PostgreSQL-backed units of work from one pool.
#[derive(Clone)]
pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
}

impl PostgresUnitOfWorkFactory {
    /// Connects a new pool using the given config.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the allocation tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(include_str!(
            "../migrations/001_create_allocation_tables.sql"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    type Uow = PostgresUnitOfWork;

    async fn begin(&self) -> Result<PostgresUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWork {
            pool: self.pool.clone(),
            repo: PostgresRepository::new(tx),
        })
    }
}
