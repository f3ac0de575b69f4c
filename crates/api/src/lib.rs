//! HTTP API server for the online shop backend.
//!
//! Provides the order and catalog endpoints used by the shop frontend,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use domain::{Money, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{ProductRepository, ShopStore, StoreError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use workflow::{OrderWorkflow, PaymentGateway};

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, P>(
    state: Arc<AppState<S, P>>,
    metrics_handle: PrometheusHandle,
    cors_allowed_origin: &str,
) -> Router
where
    S: ShopStore,
    P: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, P>))
        .route(
            "/api/orders",
            get(routes::orders::list::<S, P>).post(routes::orders::create::<S, P>),
        )
        .route("/api/products", get(routes::products::list::<S, P>))
        .with_state(state)
        .merge(metrics_router)
        .layer(cors_layer(cors_allowed_origin))
        .layer(TraceLayer::new_for_http())
}

/// Allows the shop frontend at `origin` to call the API from the browser.
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
            layer
        }
    }
}

/// Creates the application state around a store and a payment gateway.
pub fn create_default_state<S, P>(store: S, payment: P) -> Arc<AppState<S, P>>
where
    S: ShopStore,
    P: PaymentGateway + 'static,
{
    Arc::new(AppState {
        workflow: OrderWorkflow::new(store, payment),
    })
}

/// Products offered when the API runs without a database.
pub fn demo_catalog() -> Vec<Product> {
    vec![
        Product::new(1, "Wireless Mouse", Money::from_cents(2499))
            .with_description("Ergonomic 2.4 GHz mouse with USB receiver"),
        Product::new(2, "Mechanical Keyboard", Money::from_cents(8990))
            .with_description("Tenkeyless keyboard with brown switches"),
        Product::new(3, "USB-C Hub", Money::from_cents(3450))
            .with_description("Seven ports including HDMI and card reader"),
        Product::new(4, "Laptop Stand", Money::from_cents(2999)),
        Product::new(5, "Webcam HD", Money::from_cents(4950))
            .with_description("1080p webcam with built-in microphone"),
    ]
}

/// Writes the demo catalog into `store`.
pub async fn seed_demo_catalog<S: ProductRepository>(store: &S) -> Result<(), StoreError> {
    for product in demo_catalog() {
        store.upsert_product(product).await?;
    }
    Ok(())
}
