use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CorrelationId;
use domain::{Aggregate, Checkout, CheckoutEvent, DomainEvent};
use uuid::Uuid;

use crate::{Result, StoreError};

/// One journaled checkout transition.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub correlation_id: CorrelationId,
    /// Position within the checkout, starting at 1.
    pub sequence: u32,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Serializes an event into an entry for `correlation_id` at `sequence`.
    pub fn from_event(
        correlation_id: CorrelationId,
        sequence: u32,
        event: &CheckoutEvent,
    ) -> Result<Self> {
        Ok(Self {
            entry_id: Uuid::new_v4(),
            correlation_id,
            sequence,
            event_type: event.event_type().to_string(),
            payload: serde_json::to_value(event)?,
            recorded_at: Utc::now(),
        })
    }

    /// Decodes the payload back into a checkout event.
    pub fn event(&self) -> Result<CheckoutEvent> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Append-only record of checkout transitions.
///
/// Entries of one checkout form a gap-free sequence starting at 1. An
/// append is durable once it returns, which is what lets a paid checkout be
/// finished after a restart.
#[async_trait]
pub trait CheckoutJournal: Send + Sync {
    /// Appends an entry.
    ///
    /// Fails with `ConcurrencyConflict` unless `entry.sequence` is exactly
    /// one past the last stored sequence of that checkout.
    async fn append_entry(&self, entry: JournalEntry) -> Result<()>;

    /// Returns all entries of a checkout in sequence order.
    async fn entries_for(&self, correlation_id: CorrelationId) -> Result<Vec<JournalEntry>>;

    /// Returns the checkouts whose most recent entry has the given type,
    /// oldest first.
    async fn latest_of_type(&self, event_type: &str) -> Result<Vec<CorrelationId>>;
}

/// Extension trait providing typed access to the journal.
#[async_trait]
pub trait CheckoutJournalExt: CheckoutJournal {
    /// Journals `event` as the next transition of `checkout` and applies it.
    async fn record(&self, checkout: &mut Checkout, event: CheckoutEvent) -> Result<()> {
        let correlation_id = checkout.correlation_id().or(match &event {
            CheckoutEvent::CheckoutStarted(data) => Some(data.correlation_id),
            _ => None,
        });
        let correlation_id = correlation_id.ok_or_else(|| {
            StoreError::Corrupt("cannot journal an event for an unstarted checkout".to_string())
        })?;

        let entry = JournalEntry::from_event(correlation_id, checkout.sequence() + 1, &event)?;
        self.append_entry(entry).await?;
        checkout.apply(event);
        Ok(())
    }

    /// Rebuilds a checkout from its entries.
    ///
    /// Returns None if nothing was journaled under this id.
    async fn load_checkout(&self, correlation_id: CorrelationId) -> Result<Option<Checkout>> {
        let entries = self.entries_for(correlation_id).await?;
        if entries.is_empty() {
            return Ok(None);
        }
        let events = entries
            .iter()
            .map(JournalEntry::event)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Checkout::replay(events)))
    }
}

// Blanket implementation for all CheckoutJournal implementations
impl<T: CheckoutJournal + ?Sized> CheckoutJournalExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CheckoutState, Money, OrderDraft, Product};
    use rust_decimal_macros::dec;

    use crate::InMemoryStore;

    fn draft() -> OrderDraft {
        let mut draft = OrderDraft::new("Ada", "ada@example.com");
        draft
            .add_item(&Product::new(1, "P1", Money::new(dec!(10.00))), 1)
            .unwrap();
        draft
    }

    #[tokio::test]
    async fn test_record_and_load_roundtrip() {
        let store = InMemoryStore::new();
        let correlation_id = CorrelationId::new();

        let mut checkout = Checkout::default();
        let event = checkout.start(correlation_id, draft()).unwrap();
        store.record(&mut checkout, event).await.unwrap();
        let event = checkout.authorize(Some("TX-1".to_string())).unwrap();
        store.record(&mut checkout, event).await.unwrap();

        let loaded = store.load_checkout(correlation_id).await.unwrap().unwrap();
        assert_eq!(loaded.state(), CheckoutState::Authorized);
        assert_eq!(loaded.sequence(), 2);
        assert_eq!(loaded.transaction_id(), Some("TX-1"));

        let entries = store.entries_for(correlation_id).await.unwrap();
        let types: Vec<_> = entries.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["CheckoutStarted", "PaymentAuthorized"]);
    }

    #[tokio::test]
    async fn test_load_unknown_checkout_returns_none() {
        let store = InMemoryStore::new();
        assert!(
            store
                .load_checkout(CorrelationId::new())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_record_rejects_stale_checkout() {
        let store = InMemoryStore::new();
        let correlation_id = CorrelationId::new();

        let mut checkout = Checkout::default();
        let event = checkout.start(correlation_id, draft()).unwrap();
        store.record(&mut checkout, event).await.unwrap();

        let mut stale = checkout.clone();
        let event = checkout.authorize(None).unwrap();
        store.record(&mut checkout, event).await.unwrap();

        let event = stale
            .fail(domain::FailureKind::Unavailable, "timeout")
            .unwrap();
        let err = store.record(&mut stale, event).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }
}
