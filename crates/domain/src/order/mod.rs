//! Orders: the unpaid draft built during checkout and the paid, persisted order.

mod aggregate;
mod draft;
mod value_objects;

pub use aggregate::Order;
pub use draft::OrderDraft;
pub use value_objects::OrderItem;

use common::ProductId;
use thiserror::Error;

use crate::Money;

/// Largest quantity one order line may carry (fits an `INT` column).
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// Largest order total that can be charged and stored (`NUMERIC(12, 2)`).
pub fn max_order_total() -> Money {
    Money::from_cents(999_999_999_999)
}

/// Errors that can occur while building an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order must contain at least one item")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Quantity above [`MAX_LINE_QUANTITY`].
    #[error("Quantity {quantity} for product {product_id} exceeds the maximum of {max}")]
    QuantityTooLarge {
        product_id: ProductId,
        quantity: u32,
        max: u32,
    },

    /// Total above [`max_order_total`].
    #[error("Order total {total} exceeds the maximum of {max}")]
    TotalTooLarge { total: Money, max: Money },
}
