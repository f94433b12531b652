//! Event-driven message bus.
//!
//! A bus holds a registry mapping every [`EventKind`] to its handlers. One
//! external event goes in; handlers run, new events raised by the touched
//! aggregates are collected from the unit of work and pushed onto the same
//! work list, and the loop continues until the list drains.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use adapters::{NotificationSender, UnitOfWork};
use common::BatchRef;
use domain::{Event, EventKind};

use crate::error::{Result, ServiceError};
use crate::handlers::{
    AddBatchHandler, AllocateHandler, ChangeBatchQuantityHandler, EventHandler,
    OutOfStockNotificationHandler,
};

/// Upper bound on events handled per external command. A cascade that grows
/// past this is a handler loop, not a workload.
const MAX_CASCADE: usize = 1000;

/// Routes events to their registered handlers.
pub struct MessageBus<U: UnitOfWork> {
    registry: HashMap<EventKind, Vec<Box<dyn EventHandler<U>>>>,
}

impl<U: UnitOfWork + 'static> MessageBus<U> {
    /// Starts an empty registry.
    pub fn builder() -> MessageBusBuilder<U> {
        MessageBusBuilder {
            registry: HashMap::new(),
        }
    }

    /// Creates a bus with the standard allocation handlers.
    pub fn with_default_handlers(notifications: Arc<dyn NotificationSender>) -> Self {
        let mut registry: HashMap<EventKind, Vec<Box<dyn EventHandler<U>>>> = HashMap::new();
        registry.insert(EventKind::BatchCreated, vec![Box::new(AddBatchHandler)]);
        registry.insert(EventKind::AllocationRequired, vec![Box::new(AllocateHandler)]);
        registry.insert(
            EventKind::BatchQuantityChanged,
            vec![Box::new(ChangeBatchQuantityHandler)],
        );
        registry.insert(
            EventKind::OutOfStock,
            vec![Box::new(OutOfStockNotificationHandler::new(notifications))],
        );
        Self { registry }
    }

    /// Handles one event and everything it cascades into.
    ///
    /// Returns one result per handler invocation, in invocation order; the
    /// first entry belongs to the incoming event's first handler. On handler
    /// failure the unit of work is rolled back and the error propagates.
    pub async fn handle(&self, event: Event, uow: &mut U) -> Result<Vec<Option<BatchRef>>> {
        let started = Instant::now();
        let mut results = Vec::new();
        let mut queue = vec![event];
        let mut handled = 0usize;

        while let Some(event) = queue.pop() {
            handled += 1;
            if handled > MAX_CASCADE {
                return Err(ServiceError::CascadeLimitExceeded { limit: MAX_CASCADE });
            }

            let kind = event.kind();
            tracing::debug!(kind = %kind, "handling event");
            metrics::counter!("messagebus_events_handled").increment(1);

            let handlers = self
                .registry
                .get(&kind)
                .ok_or(ServiceError::MissingHandler { kind })?;
            for handler in handlers {
                match handler.handle(&event, uow).await {
                    Ok(result) => results.push(result),
                    Err(err) => {
                        metrics::counter!("messagebus_handler_failures").increment(1);
                        if let Err(rollback_err) = uow.rollback().await {
                            tracing::error!(error = %rollback_err, "rollback failed after handler error");
                        }
                        return Err(err);
                    }
                }
                queue.extend(uow.collect_new_events());
            }
        }

        metrics::histogram!("messagebus_handle_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(results)
    }
}

/// Builder that refuses to produce a bus with an incomplete registry.
pub struct MessageBusBuilder<U: UnitOfWork> {
    registry: HashMap<EventKind, Vec<Box<dyn EventHandler<U>>>>,
}

impl<U: UnitOfWork + 'static> MessageBusBuilder<U> {
    /// Registers a handler for an event kind. Multiple handlers per kind run
    /// in registration order.
    pub fn register(mut self, kind: EventKind, handler: Box<dyn EventHandler<U>>) -> Self {
        self.registry.entry(kind).or_default().push(handler);
        self
    }

    /// Validates that every event kind has at least one handler.
    pub fn build(self) -> Result<MessageBus<U>> {
        for kind in EventKind::ALL {
            if !self.registry.contains_key(&kind) {
                return Err(ServiceError::MissingHandler { kind });
            }
        }
        Ok(MessageBus {
            registry: self.registry,
        })
    }
}
