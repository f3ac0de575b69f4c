//! External services called during a checkout.

pub mod payment;

pub use payment::{
    ChargeRequest, ChargeResponse, HttpPaymentGateway, InMemoryPaymentGateway, PaymentError,
    PaymentGateway, PaymentStatus, ScriptedOutcome,
};
