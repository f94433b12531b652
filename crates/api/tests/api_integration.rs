//! Integration tests for the API server.

use std::sync::Arc;

use adapters::{InMemoryNotificationSender, InMemoryUnitOfWorkFactory};
use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let factory = InMemoryUnitOfWorkFactory::new();
    let notifications = Arc::new(InMemoryNotificationSender::new());
    let state = Arc::new(AppState::new(factory, notifications));
    api::create_app(state, get_metrics_handle())
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_add_batch_returns_created() {
    let app = setup();

    let response = app
        .oneshot(post(
            "/batches",
            serde_json::json!({
                "ref": "batch-001",
                "sku": "CRUNCHY-ARMCHAIR",
                "qty": 100,
                "eta": null
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_allocate_happy_path() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(post(
            "/batches",
            serde_json::json!({
                "ref": "batch-001",
                "sku": "VELVET-SOFA",
                "qty": 100,
                "eta": "2026-05-02"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post(
            "/batches/allocate",
            serde_json::json!({
                "order_id": "order-1",
                "sku": "VELVET-SOFA",
                "qty": 3
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["batch_ref"], "batch-001");
}

#[tokio::test]
async fn test_allocate_prefers_the_earlier_batch() {
    let app = setup();

    for (reference, eta) in [
        ("batch-slow", "2026-06-10"),
        ("batch-fast", "2026-06-01"),
    ] {
        let response = app
            .clone()
            .oneshot(post(
                "/batches",
                serde_json::json!({
                    "ref": reference,
                    "sku": "STRIPED-DECKCHAIR",
                    "qty": 100,
                    "eta": eta
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(post(
            "/batches/allocate",
            serde_json::json!({
                "order_id": "order-1",
                "sku": "STRIPED-DECKCHAIR",
                "qty": 10
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["batch_ref"], "batch-fast");
}

#[tokio::test]
async fn test_allocate_unknown_sku_is_bad_request() {
    let app = setup();

    let response = app
        .oneshot(post(
            "/batches/allocate",
            serde_json::json!({
                "order_id": "order-1",
                "sku": "NONEXISTENTSKU",
                "qty": 10
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Invalid sku NONEXISTENTSKU");
}

#[tokio::test]
async fn test_allocate_out_of_stock_is_bad_request() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(post(
            "/batches",
            serde_json::json!({
                "ref": "batch-001",
                "sku": "SPARSE-SHELF",
                "qty": 5,
                "eta": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post(
            "/batches/allocate",
            serde_json::json!({
                "order_id": "order-1",
                "sku": "SPARSE-SHELF",
                "qty": 10
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Out of stock for sku SPARSE-SHELF");
}

#[tokio::test]
async fn test_allocate_zero_quantity_is_bad_request() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(post(
            "/batches",
            serde_json::json!({
                "ref": "batch-001",
                "sku": "WIDE-BENCH",
                "qty": 50,
                "eta": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post(
            "/batches/allocate",
            serde_json::json!({
                "order_id": "order-1",
                "sku": "WIDE-BENCH",
                "qty": 0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_state_persists_across_requests() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(post(
            "/batches",
            serde_json::json!({
                "ref": "batch-001",
                "sku": "NARROW-TABLE",
                "qty": 10,
                "eta": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Fill the batch, then confirm the next order sees it as exhausted.
    let response = app
        .clone()
        .oneshot(post(
            "/batches/allocate",
            serde_json::json!({
                "order_id": "order-1",
                "sku": "NARROW-TABLE",
                "qty": 10
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post(
            "/batches/allocate",
            serde_json::json!({
                "order_id": "order-2",
                "sku": "NARROW-TABLE",
                "qty": 1
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
