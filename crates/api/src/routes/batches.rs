//! Batch and allocation endpoints.

use std::sync::Arc;

use adapters::{NotificationSender, UnitOfWorkFactory};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::BatchRef;
use domain::Event;
use serde::{Deserialize, Serialize};
use service::MessageBus;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<F: UnitOfWorkFactory> {
    pub factory: F,
    pub bus: MessageBus<F::Uow>,
}

impl<F: UnitOfWorkFactory> AppState<F>
where
    F::Uow: 'static,
{
    /// Wires the factory to a bus with the standard handlers.
    pub fn new(factory: F, notifications: Arc<dyn NotificationSender>) -> Self {
        Self {
            factory,
            bus: MessageBus::with_default_handlers(notifications),
        }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct AddBatchRequest {
    #[serde(rename = "ref")]
    pub reference: String,
    pub sku: String,
    pub qty: u32,
    pub eta: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct AllocateRequest {
    pub order_id: String,
    pub sku: String,
    pub qty: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct AllocateResponse {
    pub batch_ref: BatchRef,
}

/// POST /batches — registers a new batch of purchased stock.
pub async fn add<F: UnitOfWorkFactory>(
    State(state): State<Arc<AppState<F>>>,
    Json(req): Json<AddBatchRequest>,
) -> Result<StatusCode, ApiError>
where
    F::Uow: 'static,
{
    let mut uow = state.factory.begin().await?;
    state
        .bus
        .handle(
            Event::batch_created(req.reference, req.sku, req.qty, req.eta),
            &mut uow,
        )
        .await?;
    Ok(StatusCode::CREATED)
}

/// POST /batches/allocate — allocates an order line, returning the chosen
/// batch reference. Out of stock is the client's problem: 400.
pub async fn allocate<F: UnitOfWorkFactory>(
    State(state): State<Arc<AppState<F>>>,
    Json(req): Json<AllocateRequest>,
) -> Result<(StatusCode, Json<AllocateResponse>), ApiError>
where
    F::Uow: 'static,
{
    let sku = req.sku.clone();
    let mut uow = state.factory.begin().await?;
    let results = state
        .bus
        .handle(
            Event::allocation_required(req.order_id, req.sku, req.qty),
            &mut uow,
        )
        .await?;

    match results.into_iter().next().flatten() {
        Some(batch_ref) => Ok((StatusCode::CREATED, Json(AllocateResponse { batch_ref }))),
        None => Err(ApiError::BadRequest(format!("Out of stock for sku {sku}"))),
    }
}
