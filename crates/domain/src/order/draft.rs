//! Unpaid order under construction.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{MAX_LINE_QUANTITY, OrderError, OrderItem, max_order_total};
use crate::{Money, Product};

/// An order that has been priced but not paid.
///
/// A draft carries everything needed to persist the order later: the id
/// the order will be stored under, the customer details, the creation time
/// and the priced lines. It has no paid total; see [`super::Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    order_id: OrderId,
    customer_name: String,
    customer_email: String,
    created_at: DateTime<Utc>,
    items: Vec<OrderItem>,
}

impl OrderDraft {
    /// Starts an empty draft for a customer, stamped with the current time.
    pub fn new(customer_name: impl Into<String>, customer_email: impl Into<String>) -> Self {
        Self {
            order_id: OrderId::new(),
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    /// Overrides the creation time.
    pub fn created_at_time(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Adds a line for `quantity` units of `product` at its current price.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: product.id,
                quantity,
            });
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(OrderError::QuantityTooLarge {
                product_id: product.id,
                quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        self.items.push(OrderItem::for_product(product, quantity));
        Ok(())
    }

    /// Ensures the draft can be charged.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        let total = self.total();
        let max = max_order_total();
        if total > max {
            return Err(OrderError::TotalTooLarge { total, max });
        }
        Ok(())
    }

    /// Returns the sum of all line totals.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::total_price).sum()
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub(crate) fn into_parts(
        self,
    ) -> (OrderId, String, String, DateTime<Utc>, Vec<OrderItem>) {
        (
            self.order_id,
            self.customer_name,
            self.customer_email,
            self.created_at,
            self.items,
        )
    }
}
