//! Command handlers, one per event kind.

use std::sync::Arc;

use adapters::{NotificationSender, ProductRepository, UnitOfWork};
use async_trait::async_trait;
use common::BatchRef;
use domain::{Batch, Event, EventKind, OrderLine, Product};

use crate::error::{Result, ServiceError};

/// Handles one event against one unit of work.
///
/// Handlers return `Ok(Some(batch_ref))` only when the event produced an
/// allocation; everything else returns `Ok(None)`.
#[async_trait]
pub trait EventHandler<U: UnitOfWork>: Send + Sync {
    async fn handle(&self, event: &Event, uow: &mut U) -> Result<Option<BatchRef>>;
}

fn mismatched(expected: EventKind, event: &Event) -> ServiceError {
    ServiceError::MismatchedEvent {
        expected,
        actual: event.kind(),
    }
}

/// Creates the product on first sight of its sku, then records the batch.
pub struct AddBatchHandler;

#[async_trait]
impl<U: UnitOfWork> EventHandler<U> for AddBatchHandler {
    #[tracing::instrument(skip(self, event, uow))]
    async fn handle(&self, event: &Event, uow: &mut U) -> Result<Option<BatchRef>> {
        let Event::BatchCreated(data) = event else {
            return Err(mismatched(EventKind::BatchCreated, event));
        };

        if uow.products().get(&data.sku).await?.is_none() {
            uow.products().add(Product::new(data.sku.clone())).await?;
        }
        let product = uow
            .products()
            .get(&data.sku)
            .await?
            .ok_or_else(|| ServiceError::InvalidSku {
                sku: data.sku.clone(),
            })?;
        product.add_batch(Batch::new(
            data.reference.clone(),
            data.sku.clone(),
            data.qty,
            data.eta,
        ));
        uow.commit().await?;

        tracing::info!(sku = %data.sku, reference = %data.reference, qty = data.qty, "batch added");
        Ok(None)
    }
}

/// Runs the allocation algorithm for one order line.
pub struct AllocateHandler;

#[async_trait]
impl<U: UnitOfWork> EventHandler<U> for AllocateHandler {
    #[tracing::instrument(skip(self, event, uow))]
    async fn handle(&self, event: &Event, uow: &mut U) -> Result<Option<BatchRef>> {
        let Event::AllocationRequired(data) = event else {
            return Err(mismatched(EventKind::AllocationRequired, event));
        };
        if data.qty == 0 {
            return Err(ServiceError::InvalidQuantity { qty: data.qty });
        }

        let line = OrderLine::new(data.sku.clone(), data.order_id.clone(), data.qty);
        let product = uow
            .products()
            .get(&data.sku)
            .await?
            .ok_or_else(|| ServiceError::InvalidSku {
                sku: data.sku.clone(),
            })?;
        let batch_ref = product.allocate(&line);
        uow.commit().await?;

        match &batch_ref {
            Some(reference) => {
                tracing::info!(sku = %data.sku, order_id = %data.order_id, batch = %reference, "order line allocated");
            }
            None => {
                tracing::warn!(sku = %data.sku, order_id = %data.order_id, "allocation failed: out of stock");
            }
        }
        Ok(batch_ref)
    }
}

/// Applies a purchased-quantity change, deallocating excess order lines.
pub struct ChangeBatchQuantityHandler;

#[async_trait]
impl<U: UnitOfWork> EventHandler<U> for ChangeBatchQuantityHandler {
    #[tracing::instrument(skip(self, event, uow))]
    async fn handle(&self, event: &Event, uow: &mut U) -> Result<Option<BatchRef>> {
        let Event::BatchQuantityChanged(data) = event else {
            return Err(mismatched(EventKind::BatchQuantityChanged, event));
        };

        let product = uow
            .products()
            .get_by_batch_ref(&data.reference)
            .await?
            .ok_or_else(|| ServiceError::InvalidBatchReference {
                reference: data.reference.clone(),
            })?;
        product
            .change_batch_quantity(&data.reference, data.qty)
            .map_err(|_| ServiceError::InvalidBatchReference {
                reference: data.reference.clone(),
            })?;
        uow.commit().await?;

        tracing::info!(reference = %data.reference, qty = data.qty, "batch quantity changed");
        Ok(None)
    }
}

/// Forwards out-of-stock events to the notification channel.
///
/// Delivery failures are logged, never propagated: losing a notification
/// must not roll back the allocation that raised it.
pub struct OutOfStockNotificationHandler {
    sender: Arc<dyn NotificationSender>,
}

impl OutOfStockNotificationHandler {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl<U: UnitOfWork> EventHandler<U> for OutOfStockNotificationHandler {
    #[tracing::instrument(skip(self, event, _uow))]
    async fn handle(&self, event: &Event, _uow: &mut U) -> Result<Option<BatchRef>> {
        let Event::OutOfStock(data) = event else {
            return Err(mismatched(EventKind::OutOfStock, event));
        };

        if let Err(err) = self.sender.send(data).await {
            tracing::warn!(sku = %data.sku, error = %err, "failed to deliver out-of-stock notification");
        }
        Ok(None)
    }
}
