//! Product catalog endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::Product;
use rust_decimal::Decimal;
use serde::Serialize;
use store::ShopStore;
use workflow::PaymentGateway;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name,
            description: product.description,
            price: product.price.amount(),
        }
    }
}

/// GET /api/products: the catalog ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list<S: ShopStore, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.workflow.list_products().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}
