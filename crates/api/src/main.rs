//! API server entry point.

use std::sync::Arc;

use adapters::{
    DatabaseConfig, InMemoryUnitOfWorkFactory, LoggingNotificationSender, PostgresUnitOfWorkFactory,
    UnitOfWorkFactory,
};
use api::AppState;
use api::config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<F: UnitOfWorkFactory + 'static>(state: Arc<AppState<F>>, config: &Config)
where
    F::Uow: 'static,
{
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let notifications = Arc::new(LoggingNotificationSender::new());

    match config.database_url.clone() {
        Some(url) => {
            let factory = PostgresUnitOfWorkFactory::connect(&DatabaseConfig::new(url))
                .await
                .expect("failed to connect to database");
            factory
                .ensure_schema()
                .await
                .expect("failed to create schema");
            tracing::info!("using PostgreSQL backend");
            let state = Arc::new(AppState::new(factory, notifications));
            serve(state, &config).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory backend");
            let factory = InMemoryUnitOfWorkFactory::new();
            let state = Arc::new(AppState::new(factory, notifications));
            serve(state, &config).await;
        }
    }
}
