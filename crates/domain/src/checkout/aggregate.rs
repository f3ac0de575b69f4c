//! Checkout aggregate.

use common::CorrelationId;
use serde::{Deserialize, Serialize};

use super::{CheckoutError, CheckoutEvent, CheckoutState, FailureKind};
use crate::aggregate::Aggregate;
use crate::{Money, Order, OrderDraft};

/// An event-sourced checkout.
///
/// Holds the priced draft and records what the payment service answered.
/// Rebuilt from the checkout journal, so the authorization outcome survives
/// a crash between payment and persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkout {
    correlation_id: Option<CorrelationId>,
    sequence: u32,
    state: CheckoutState,
    draft: Option<OrderDraft>,
    amount: Money,
    transaction_id: Option<String>,
    failure: Option<(FailureKind, String)>,
}

impl Aggregate for Checkout {
    type Event = CheckoutEvent;
    type Error = CheckoutError;

    fn aggregate_type() -> &'static str {
        "Checkout"
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CheckoutEvent::CheckoutStarted(data) => {
                self.correlation_id = Some(data.correlation_id);
                self.amount = data.amount;
                self.draft = Some(data.draft);
                self.state = CheckoutState::Created;
            }
            CheckoutEvent::PaymentAuthorized(data) => {
                self.transaction_id = data.transaction_id;
                self.state = CheckoutState::Authorized;
            }
            CheckoutEvent::PaymentFailed(data) => {
                self.failure = Some((data.kind, data.reason));
                self.state = CheckoutState::Failed;
            }
            CheckoutEvent::OrderPersisted(_) => {
                self.state = CheckoutState::Persisted;
            }
        }
        self.sequence += 1;
    }
}

// Query methods
impl Checkout {
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn draft(&self) -> Option<&OrderDraft> {
        self.draft.as_ref()
    }

    /// Returns the amount that was sent to the payment service.
    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|(kind, _)| *kind)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_ref().map(|(_, reason)| reason.as_str())
    }

    /// Returns the paid order.
    ///
    /// Only available once the payment is authorized; this is the one way to
    /// turn a draft into an [`Order`].
    pub fn paid_order(&self) -> Result<Order, CheckoutError> {
        let draft = self.draft.as_ref().ok_or(CheckoutError::NotStarted)?;
        match self.state {
            CheckoutState::Authorized | CheckoutState::Persisted => {
                Ok(Order::from_paid_draft(draft.clone()))
            }
            current_state => Err(CheckoutError::InvalidStateTransition {
                current_state,
                action: "take paid order",
            }),
        }
    }
}

// Command methods (return events)
impl Checkout {
    /// Starts a checkout for a priced draft.
    pub fn start(
        &self,
        correlation_id: CorrelationId,
        draft: OrderDraft,
    ) -> Result<CheckoutEvent, CheckoutError> {
        if self.correlation_id.is_some() {
            return Err(CheckoutError::AlreadyStarted);
        }
        draft.validate()?;

        Ok(CheckoutEvent::checkout_started(correlation_id, draft))
    }

    /// Records that the payment service confirmed the charge.
    pub fn authorize(&self, transaction_id: Option<String>) -> Result<CheckoutEvent, CheckoutError> {
        self.ensure_started()?;
        if !self.state.can_authorize() {
            return Err(CheckoutError::InvalidStateTransition {
                current_state: self.state,
                action: "authorize payment",
            });
        }

        Ok(CheckoutEvent::payment_authorized(transaction_id))
    }

    /// Records that the payment did not go through.
    pub fn fail(
        &self,
        kind: FailureKind,
        reason: impl Into<String>,
    ) -> Result<CheckoutEvent, CheckoutError> {
        self.ensure_started()?;
        if !self.state.can_fail() {
            return Err(CheckoutError::InvalidStateTransition {
                current_state: self.state,
                action: "fail payment",
            });
        }

        Ok(CheckoutEvent::payment_failed(kind, reason))
    }

    /// Records that the paid order was written to storage.
    pub fn mark_persisted(&self) -> Result<CheckoutEvent, CheckoutError> {
        let draft = self.draft.as_ref().ok_or(CheckoutError::NotStarted)?;
        if !self.state.can_persist() {
            return Err(CheckoutError::InvalidStateTransition {
                current_state: self.state,
                action: "persist order",
            });
        }

        Ok(CheckoutEvent::order_persisted(draft.order_id()))
    }

    fn ensure_started(&self) -> Result<(), CheckoutError> {
        if self.correlation_id.is_none() {
            return Err(CheckoutError::NotStarted);
        }
        Ok(())
    }
}
