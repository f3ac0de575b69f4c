//! Order checkout for the online shop.
//!
//! A checkout prices the requested items against the catalog, asks the
//! payment service to charge the total and stores the order only once the
//! charge went through:
//! 1. Journal `CheckoutStarted`
//! 2. Charge the payment service
//! 3. Journal `PaymentAuthorized` or `PaymentFailed`
//! 4. Save the order and journal `OrderPersisted`
//!
//! A crash between steps 3 and 4 leaves an authorized checkout in the
//! journal, which [`CheckoutRecovery`] finishes on the next start. If the
//! authorization itself cannot be journaled the order is still saved, and
//! recovery closes the checkout from the stored order.

pub mod error;
pub mod recovery;
pub mod services;
pub mod workflow;

pub use error::{Result, WorkflowError};
pub use recovery::{CheckoutRecovery, RecoveryReport};
pub use services::{
    ChargeRequest, ChargeResponse, HttpPaymentGateway, InMemoryPaymentGateway, PaymentError,
    PaymentGateway, PaymentStatus, ScriptedOutcome,
};
pub use workflow::{CreateOrder, OrderLine, OrderWorkflow};
