//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use store::ShopStore;
use workflow::PaymentGateway;

use crate::routes::orders::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// GET /health: reports whether the product catalog can be read.
pub async fn check<S: ShopStore, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.workflow.list_products().await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                storage: "up",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    storage: "down",
                }),
            )
        }
    }
}
