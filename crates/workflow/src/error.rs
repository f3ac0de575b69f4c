//! Workflow error types.

use domain::{CheckoutError, OrderError};
use store::StoreError;
use thiserror::Error;

/// Message used when the payment service declines without saying why.
pub const DEFAULT_DECLINE_MESSAGE: &str = "Payment declined or no response from payment service.";

/// Errors that can occur while placing or reading orders.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The request cannot become an order.
    #[error("Invalid order: {0}")]
    InvalidArgument(String),

    /// The payment service could not be reached or answered with an error.
    #[error("Payment service is currently unavailable.")]
    PaymentUnavailable,

    /// The payment service answered but did not confirm the charge.
    #[error("Order could not be paid: {0}")]
    PaymentDeclined(String),

    /// A checkout was driven through a transition its state does not allow.
    #[error("Checkout error: {0}")]
    InvalidTransition(CheckoutError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Returns true for errors caused by the request or the payment outcome
    /// rather than by the backend itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidArgument(_)
                | WorkflowError::PaymentUnavailable
                | WorkflowError::PaymentDeclined(_)
        )
    }
}

impl From<OrderError> for WorkflowError {
    fn from(err: OrderError) -> Self {
        WorkflowError::InvalidArgument(err.to_string())
    }
}

impl From<CheckoutError> for WorkflowError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Order(order_err) => order_err.into(),
            other => WorkflowError::InvalidTransition(other),
        }
    }
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
