//! Checkout aggregate: one order submission tracked from pricing to persistence.

mod aggregate;
mod events;
mod state;

pub use aggregate::Checkout;
pub use events::{
    CheckoutEvent, CheckoutStartedData, FailureKind, OrderPersistedData, PaymentAuthorizedData,
    PaymentFailedData,
};
pub use state::CheckoutState;

use thiserror::Error;

use crate::OrderError;

/// Errors that can occur when driving a checkout through its states.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// The checkout was already started.
    #[error("Checkout already started")]
    AlreadyStarted,

    /// No `CheckoutStarted` event has been applied yet.
    #[error("Checkout not started")]
    NotStarted,

    /// The draft cannot be charged.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Checkout is not in the expected state.
    #[error("Invalid checkout transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: CheckoutState,
        action: &'static str,
    },
}
