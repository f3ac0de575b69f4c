//! Paid order.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{OrderDraft, OrderItem};
use crate::Money;

/// A confirmed, paid order.
///
/// Outside of this crate an `Order` can only be obtained from a checkout
/// whose payment was authorized, or rebuilt from storage. Its total always
/// equals the sum of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_name: String,
    customer_email: String,
    created_at: DateTime<Utc>,
    total_amount: Money,
    items: Vec<OrderItem>,
}

impl Order {
    /// Seals a draft into a paid order.
    pub(crate) fn from_paid_draft(draft: OrderDraft) -> Self {
        let total_amount = draft.total();
        let (id, customer_name, customer_email, created_at, items) = draft.into_parts();
        Self {
            id,
            customer_name,
            customer_email,
            created_at,
            total_amount,
            items,
        }
    }

    /// Rebuilds an order read back from storage.
    ///
    /// Only orders that were persisted after payment exist in storage, so
    /// the stored total is taken as is.
    pub fn from_persisted(
        id: OrderId,
        customer_name: String,
        customer_email: String,
        created_at: DateTime<Utc>,
        total_amount: Money,
        items: Vec<OrderItem>,
    ) -> Self {
        Self {
            id,
            customer_name,
            customer_email,
            created_at,
            total_amount,
            items,
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
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

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the lines in the order they were requested.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
