//! HTTP API server with observability for the allocation service.
//!
//! Provides REST endpoints for registering batches and allocating order
//! lines, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use adapters::UnitOfWorkFactory;
use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::batches::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<F: UnitOfWorkFactory + 'static>(
    state: Arc<AppState<F>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    F::Uow: 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/batches", post(routes::batches::add::<F>))
        .route("/batches/allocate", post(routes::batches::allocate::<F>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
