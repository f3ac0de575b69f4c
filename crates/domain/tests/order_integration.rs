//! Integration tests for the checkout aggregate.
//!
//! These tests drive full checkouts and rebuild them from their serialized
//! event history, the way the checkout journal stores them.

use common::{CorrelationId, ProductId};
use domain::{
    Aggregate, Checkout, CheckoutError, CheckoutEvent, CheckoutState, DomainEvent, FailureKind,
    Money, OrderDraft, OrderError, Product,
};
use rust_decimal_macros::dec;

fn products() -> (Product, Product) {
    (
        Product::new(1, "P1", Money::new(dec!(10.00))),
        Product::new(2, "P2", Money::new(dec!(5.50))),
    )
}

fn draft_for(email: &str) -> OrderDraft {
    let (p1, p2) = products();
    let mut draft = OrderDraft::new("Customer", email);
    draft.add_item(&p1, 2).unwrap();
    draft.add_item(&p2, 1).unwrap();
    draft
}

/// Applies an event and keeps the serialized form, as the journal would.
fn record(checkout: &mut Checkout, history: &mut Vec<serde_json::Value>, event: CheckoutEvent) {
    history.push(serde_json::to_value(&event).unwrap());
    checkout.apply(event);
}

fn rebuild(history: &[serde_json::Value]) -> Checkout {
    Checkout::replay(
        history
            .iter()
            .map(|payload| serde_json::from_value::<CheckoutEvent>(payload.clone()).unwrap()),
    )
}

mod checkout_lifecycle {
    use super::*;

    #[test]
    fn paid_checkout_produces_order_with_exact_total() {
        let mut checkout = Checkout::default();
        let mut history = Vec::new();

        let event = checkout
            .start(CorrelationId::new(), draft_for("ada@example.com"))
            .unwrap();
        record(&mut checkout, &mut history, event);

        let event = checkout.authorize(Some("TX-42".to_string())).unwrap();
        record(&mut checkout, &mut history, event);

        let order = checkout.paid_order().unwrap();
        assert_eq!(order.total_amount(), Money::new(dec!(25.50)));
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.items()[0].product_id, ProductId::new(1));
        assert_eq!(order.items()[0].unit_price, Money::new(dec!(10.00)));

        let event = checkout.mark_persisted().unwrap();
        record(&mut checkout, &mut history, event);

        let rebuilt = rebuild(&history);
        assert_eq!(rebuilt.state(), CheckoutState::Persisted);
        assert_eq!(rebuilt.sequence(), 3);
        assert_eq!(rebuilt.transaction_id(), Some("TX-42"));
        assert_eq!(rebuilt.paid_order().unwrap(), order);
    }

    #[test]
    fn authorized_checkout_rebuilds_as_needing_recovery() {
        let mut checkout = Checkout::default();
        let mut history = Vec::new();

        let event = checkout
            .start(CorrelationId::new(), draft_for("grace@example.com"))
            .unwrap();
        record(&mut checkout, &mut history, event);
        let event = checkout.authorize(None).unwrap();
        record(&mut checkout, &mut history, event);

        let rebuilt = rebuild(&history);
        assert!(rebuilt.state().needs_recovery());
        assert_eq!(
            rebuilt.paid_order().unwrap().id(),
            checkout.draft().unwrap().order_id()
        );
    }

    #[test]
    fn declined_checkout_keeps_reason() {
        let mut checkout = Checkout::default();
        let mut history = Vec::new();

        let event = checkout
            .start(CorrelationId::new(), draft_for("ada@example.com"))
            .unwrap();
        record(&mut checkout, &mut history, event);
        let event = checkout
            .fail(FailureKind::Declined, "Insufficient funds")
            .unwrap();
        assert_eq!(event.event_type(), "PaymentFailed");
        record(&mut checkout, &mut history, event);

        let rebuilt = rebuild(&history);
        assert_eq!(rebuilt.state(), CheckoutState::Failed);
        assert_eq!(rebuilt.failure_reason(), Some("Insufficient funds"));
        assert!(matches!(
            rebuilt.mark_persisted(),
            Err(CheckoutError::InvalidStateTransition { .. })
        ));
    }
}

mod pricing {
    use super::*;

    #[test]
    fn cent_amounts_sum_without_rounding_error() {
        let product = Product::new(3, "Sticker", Money::new(dec!(0.10)));
        let mut draft = OrderDraft::new("Customer", "c@example.com");
        for _ in 0..3 {
            draft.add_item(&product, 1).unwrap();
        }
        assert_eq!(draft.total(), Money::new(dec!(0.30)));
    }

    #[test]
    fn empty_draft_cannot_start_checkout() {
        let err = Checkout::default()
            .start(CorrelationId::new(), OrderDraft::new("Customer", "c@example.com"))
            .unwrap_err();
        assert_eq!(err, CheckoutError::Order(OrderError::NoItems));
    }
}
