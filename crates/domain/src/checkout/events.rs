//! Checkout domain events.

use chrono::{DateTime, Utc};
use common::{CorrelationId, OrderId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::{Money, OrderDraft};

/// Events journaled while a checkout runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CheckoutEvent {
    /// Draft priced, about to be charged.
    CheckoutStarted(CheckoutStartedData),

    /// Payment service confirmed the charge.
    PaymentAuthorized(PaymentAuthorizedData),

    /// Payment service declined or could not be reached.
    PaymentFailed(PaymentFailedData),

    /// Order written to storage.
    OrderPersisted(OrderPersistedData),
}

impl CheckoutEvent {
    pub const CHECKOUT_STARTED: &'static str = "CheckoutStarted";
    pub const PAYMENT_AUTHORIZED: &'static str = "PaymentAuthorized";
    pub const PAYMENT_FAILED: &'static str = "PaymentFailed";
    pub const ORDER_PERSISTED: &'static str = "OrderPersisted";
}

impl DomainEvent for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::CheckoutStarted(_) => Self::CHECKOUT_STARTED,
            CheckoutEvent::PaymentAuthorized(_) => Self::PAYMENT_AUTHORIZED,
            CheckoutEvent::PaymentFailed(_) => Self::PAYMENT_FAILED,
            CheckoutEvent::OrderPersisted(_) => Self::ORDER_PERSISTED,
        }
    }
}

/// Data for CheckoutStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStartedData {
    /// Reference sent to the payment service.
    pub correlation_id: CorrelationId,
    /// The complete unpaid order.
    pub draft: OrderDraft,
    /// Amount to be charged.
    pub amount: Money,
    /// Currency of the charge.
    pub currency: String,
    pub started_at: DateTime<Utc>,
}

/// Data for PaymentAuthorized event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAuthorizedData {
    /// Transaction ID reported by the payment service, if any.
    pub transaction_id: Option<String>,
    pub authorized_at: DateTime<Utc>,
}

/// Why a payment did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The payment service answered with a status other than paid.
    Declined,
    /// The payment service could not be reached or answered garbage.
    Unavailable,
}

/// Data for PaymentFailed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedData {
    pub kind: FailureKind,
    /// Human-readable reason.
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Data for OrderPersisted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPersistedData {
    pub order_id: OrderId,
    pub persisted_at: DateTime<Utc>,
}

// Factory methods
impl CheckoutEvent {
    pub fn checkout_started(correlation_id: CorrelationId, draft: OrderDraft) -> Self {
        let amount = draft.total();
        CheckoutEvent::CheckoutStarted(CheckoutStartedData {
            correlation_id,
            draft,
            amount,
            currency: Money::CURRENCY.to_string(),
            started_at: Utc::now(),
        })
    }

    pub fn payment_authorized(transaction_id: Option<String>) -> Self {
        CheckoutEvent::PaymentAuthorized(PaymentAuthorizedData {
            transaction_id,
            authorized_at: Utc::now(),
        })
    }

    pub fn payment_failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        CheckoutEvent::PaymentFailed(PaymentFailedData {
            kind,
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }

    pub fn order_persisted(order_id: OrderId) -> Self {
        CheckoutEvent::OrderPersisted(OrderPersistedData {
            order_id,
            persisted_at: Utc::now(),
        })
    }
}
