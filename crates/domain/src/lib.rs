//! Domain layer for the online shop backend.
//!
//! This crate provides the core domain types including:
//! - `Money`, a fixed-point currency amount
//! - `Product`, the read-only catalog entry
//! - `OrderDraft` and `Order`, the unpaid and the paid order
//! - `Checkout`, the event-sourced state machine that tracks one order
//!   submission through payment authorization and persistence

pub mod aggregate;
pub mod checkout;
pub mod money;
pub mod order;
pub mod product;

pub use aggregate::{Aggregate, DomainEvent};
pub use checkout::{
    Checkout, CheckoutError, CheckoutEvent, CheckoutStartedData, CheckoutState, FailureKind,
    OrderPersistedData, PaymentAuthorizedData, PaymentFailedData,
};
pub use money::Money;
pub use order::{MAX_LINE_QUANTITY, Order, OrderDraft, OrderError, OrderItem, max_order_total};
pub use product::Product;
