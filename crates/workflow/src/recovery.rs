//! Completion of checkouts that were paid but never stored.

use common::CorrelationId;
use domain::{CheckoutEvent, CheckoutState};
use store::{CheckoutJournalExt, SaveOutcome, ShopStore};

use crate::error::Result;

/// Outcome of one recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Checkouts moved to `Persisted`.
    pub completed: usize,
    /// Of those, checkouts whose order was already stored.
    pub already_stored: usize,
    /// Checkouts that are still authorized after this pass.
    pub failed: usize,
}

/// Finds paid checkouts in the journal and stores their orders.
///
/// A checkout is paid when it is authorized, or when it is still created but
/// its order was stored after the authorization failed to journal. Orders
/// keep the id assigned when their draft was built, so running a pass twice,
/// or after the original request did store the order, never writes an order
/// twice.
#[derive(Debug, Clone)]
pub struct CheckoutRecovery<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> CheckoutRecovery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Runs one recovery pass over the whole journal.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<RecoveryReport> {
        let mut candidates = self
            .store
            .latest_of_type(CheckoutEvent::PAYMENT_AUTHORIZED)
            .await?;
        candidates.extend(
            self.store
                .latest_of_type(CheckoutEvent::CHECKOUT_STARTED)
                .await?,
        );

        let mut report = RecoveryReport::default();
        for correlation_id in candidates {
            match self.complete(correlation_id).await {
                Ok(Some(outcome)) => {
                    report.completed += 1;
                    if outcome == SaveOutcome::AlreadyPresent {
                        report.already_stored += 1;
                    }
                    metrics::counter!("checkouts_recovered_total").increment(1);
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(%correlation_id, error = %e, "checkout recovery failed");
                }
            }
        }

        if report.completed > 0 || report.failed > 0 {
            tracing::info!(
                completed = report.completed,
                already_stored = report.already_stored,
                failed = report.failed,
                "checkout recovery finished"
            );
        }
        Ok(report)
    }

    async fn complete(&self, correlation_id: CorrelationId) -> Result<Option<SaveOutcome>> {
        let Some(mut checkout) = self.store.load_checkout(correlation_id).await? else {
            return Ok(None);
        };

        let outcome = match checkout.state() {
            CheckoutState::Authorized => {
                let order = checkout.paid_order()?;
                self.store.save_order(&order).await?
            }
            // Only a stored order proves the charge went through.
            CheckoutState::Created => {
                let Some(draft) = checkout.draft() else {
                    return Ok(None);
                };
                if self.store.find_order(draft.order_id()).await?.is_none() {
                    return Ok(None);
                }
                let authorized = checkout.authorize(None)?;
                self.store.record(&mut checkout, authorized).await?;
                SaveOutcome::AlreadyPresent
            }
            _ => return Ok(None),
        };

        let persisted = checkout.mark_persisted()?;
        self.store.record(&mut checkout, persisted).await?;

        tracing::info!(%correlation_id, ?outcome, "recovered paid checkout");
        Ok(Some(outcome))
    }
}
