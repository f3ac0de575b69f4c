//! Order placement and order query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use domain::{Order, OrderItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::ShopStore;
use workflow::{CreateOrder, OrderLine, OrderWorkflow, PaymentGateway};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ShopStore, P: PaymentGateway> {
    pub workflow: OrderWorkflow<S, P>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    /// Missing or null is treated like an empty list.
    #[serde(default)]
    pub items: Option<Vec<OrderItemRequest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

impl From<CreateOrderRequest> for CreateOrder {
    fn from(req: CreateOrderRequest) -> Self {
        CreateOrder {
            customer_name: req.customer_name,
            customer_email: req.customer_email,
            items: req
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|item| OrderLine::new(item.product_id, item.quantity))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub email: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.as_i64(),
            product_name: item.product_name.clone(),
            unit_price: item.unit_price.amount(),
            quantity: item.quantity,
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_name: order.customer_name().to_string(),
            customer_email: order.customer_email().to_string(),
            total_amount: order.total_amount().amount(),
            created_at: order.created_at(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /api/orders: price, charge and store an order.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: ShopStore, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Json(req) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid order: {}", e.body_text())))?;

    let order = state.workflow.create_order(req.into()).await?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /api/orders?email=: orders of one customer, or all orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: ShopStore, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = match query.email {
        Some(email) => state.workflow.get_orders_by_email(&email).await?,
        None => state.workflow.list_orders().await?,
    };

    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}
