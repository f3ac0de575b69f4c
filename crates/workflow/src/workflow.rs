//! Order placement and order queries.

use std::time::Instant;

use common::{CorrelationId, ProductId};
use domain::{Aggregate, Checkout, CheckoutEvent, FailureKind, Order, OrderDraft, Product};
use serde::{Deserialize, Serialize};
use store::{CheckoutJournalExt, ShopStore};

use crate::error::{DEFAULT_DECLINE_MESSAGE, Result, WorkflowError};
use crate::services::payment::{ChargeRequest, ChargeResponse, PaymentError, PaymentGateway};

/// One requested order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Request to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderLine>,
}

impl CreateOrder {
    pub fn new(customer_name: impl Into<String>, customer_email: impl Into<String>) -> Self {
        Self {
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            items: Vec::new(),
        }
    }

    /// Adds a line to the request.
    pub fn with_item(mut self, product_id: impl Into<ProductId>, quantity: u32) -> Self {
        self.items.push(OrderLine::new(product_id, quantity));
        self
    }
}

/// Places paid orders and answers order queries.
///
/// Every order submission runs as a journaled checkout, so the outcome of the
/// charge is durable before the order is written.
pub struct OrderWorkflow<S, P>
where
    S: ShopStore,
    P: PaymentGateway,
{
    store: S,
    payment: P,
}

impl<S, P> OrderWorkflow<S, P>
where
    S: ShopStore,
    P: PaymentGateway,
{
    /// Creates a new order workflow.
    pub fn new(store: S, payment: P) -> Self {
        Self { store, payment }
    }

    /// Prices, charges and stores an order.
    ///
    /// Returns the stored order. Nothing is stored unless the payment service
    /// answered `PAID`.
    #[tracing::instrument(skip(self, request), fields(customer_email = %request.customer_email, lines = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.run_checkout(request).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(order_id = %order.id(), total = %order.total_amount(), "order created");
            }
            Err(WorkflowError::PaymentDeclined(reason)) => {
                metrics::counter!("payment_declined_total").increment(1);
                tracing::info!(%reason, "payment declined");
            }
            Err(WorkflowError::PaymentUnavailable) => {
                metrics::counter!("payment_unavailable_total").increment(1);
            }
            Err(WorkflowError::InvalidArgument(detail)) => {
                tracing::debug!(%detail, "order rejected");
            }
            Err(e) => {
                tracing::error!(error = %e, "checkout failed");
            }
        }

        result
    }

    async fn run_checkout(&self, request: CreateOrder) -> Result<Order> {
        // 1. Price the draft against the catalog
        let draft = self.build_draft(request).await?;

        let customer_email = draft.customer_email().to_string();

        // 2. Journal the start before anything leaves the process
        let correlation_id = CorrelationId::new();
        let mut checkout = Checkout::default();
        let started = checkout.start(correlation_id, draft)?;
        self.store.record(&mut checkout, started).await?;

        let charge = ChargeRequest::new(checkout.amount(), correlation_id, &customer_email);
        tracing::info!(%correlation_id, amount = %checkout.amount(), "charging customer");

        // 3. Charge and journal the outcome
        let mut unjournaled: Option<CheckoutEvent> = None;
        match self.payment.charge(charge).await {
            Ok(ChargeResponse {
                status,
                transaction_id,
                ..
            }) if status.is_paid() => {
                let authorized = checkout.authorize(transaction_id)?;
                if let Err(e) = self.store.record(&mut checkout, authorized.clone()).await {
                    // The customer is charged; store the order regardless.
                    tracing::error!(%correlation_id, error = %e, "could not journal payment authorization");
                    unjournaled = Some(authorized);
                }
            }
            Ok(ChargeResponse { status, message, .. }) => {
                let message = message.unwrap_or_else(|| DEFAULT_DECLINE_MESSAGE.to_string());
                tracing::debug!(?status, "charge not confirmed");
                self.record_failure(&mut checkout, FailureKind::Declined, &message)
                    .await;
                return Err(WorkflowError::PaymentDeclined(message));
            }
            Err(PaymentError::EmptyResponse) => {
                self.record_failure(&mut checkout, FailureKind::Declined, DEFAULT_DECLINE_MESSAGE)
                    .await;
                return Err(WorkflowError::PaymentDeclined(
                    DEFAULT_DECLINE_MESSAGE.to_string(),
                ));
            }
            Err(e) => {
                tracing::warn!(%correlation_id, error = %e, "payment service unreachable");
                self.record_failure(&mut checkout, FailureKind::Unavailable, &e.to_string())
                    .await;
                return Err(WorkflowError::PaymentUnavailable);
            }
        }

        // 4. Store the paid order; on failure the checkout stays authorized
        let order = match &unjournaled {
            None => checkout.paid_order()?,
            Some(authorized) => {
                let mut paid = checkout.clone();
                paid.apply(authorized.clone());
                paid.paid_order()?
            }
        };
        if let Err(e) = self.store.save_order(&order).await {
            tracing::error!(%correlation_id, order_id = %order.id(), error = %e, "paid order could not be stored");
            if let Some(authorized) = unjournaled {
                if let Err(journal_err) = self.store.record(&mut checkout, authorized).await {
                    tracing::error!(%correlation_id, error = %journal_err, "paid checkout is not recoverable");
                }
            }
            return Err(e.into());
        }

        // 5. Close the checkout; recovery re-marks it if this fails
        if let Err(e) = self.finish_checkout(&mut checkout, unjournaled).await {
            tracing::warn!(%correlation_id, error = %e, "could not journal persisted order");
        }

        Ok(order)
    }

    /// Journals the missing authorization, if any, then `OrderPersisted`.
    async fn finish_checkout(
        &self,
        checkout: &mut Checkout,
        unjournaled: Option<CheckoutEvent>,
    ) -> Result<()> {
        if let Some(authorized) = unjournaled {
            self.store.record(checkout, authorized).await?;
        }
        let persisted = checkout.mark_persisted()?;
        self.store.record(checkout, persisted).await?;
        Ok(())
    }

    async fn build_draft(&self, request: CreateOrder) -> Result<OrderDraft> {
        let mut draft = OrderDraft::new(request.customer_name, request.customer_email);
        for line in &request.items {
            let product = self.product(line.product_id).await?;
            draft.add_item(&product, line.quantity)?;
        }
        draft.validate()?;
        Ok(draft)
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| WorkflowError::InvalidArgument(format!("Product not found: {id}")))
    }

    /// Journals a failed payment. The payment error wins over a journal error.
    async fn record_failure(&self, checkout: &mut Checkout, kind: FailureKind, reason: &str) {
        let event = match checkout.fail(kind, reason) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "cannot mark checkout as failed");
                return;
            }
        };
        if let Err(e) = self.store.record(checkout, event).await {
            tracing::warn!(error = %e, "could not journal failed payment");
        }
    }

    /// Returns the orders placed with exactly `email`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_orders_by_email(&self, email: &str) -> Result<Vec<Order>> {
        Ok(self.store.find_orders_by_email(email).await?)
    }

    /// Returns every order, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    /// Returns the product catalog ordered by id.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }
}
