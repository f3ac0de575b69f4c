//! Payment gateway trait, HTTP client and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use common::CorrelationId;
use domain::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Payment method sent with every charge.
pub const PAYMENT_METHOD: &str = "CREDIT_CARD";

/// Body of `POST /api/payments/charge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    /// Correlation id of the checkout; the order id is never sent.
    pub order_reference: String,
    pub customer_email: String,
    pub method: String,
}

impl ChargeRequest {
    /// Builds a credit card charge for `amount`.
    pub fn new(amount: Money, order_reference: CorrelationId, customer_email: &str) -> Self {
        Self {
            amount: amount.amount(),
            currency: Money::CURRENCY.to_string(),
            order_reference: order_reference.to_string(),
            customer_email: customer_email.to_string(),
            method: PAYMENT_METHOD.to_string(),
        }
    }
}

/// Charge status reported by the payment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Paid,
    Declined,
    /// Any status this client does not know about.
    Other(String),
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl From<String> for PaymentStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "PAID" => PaymentStatus::Paid,
            "DECLINED" => PaymentStatus::Declined,
            _ => PaymentStatus::Other(status),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Paid => "PAID".to_string(),
            PaymentStatus::Declined => "DECLINED".to_string(),
            PaymentStatus::Other(other) => other,
        }
    }
}

/// Answer of the payment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResponse {
    pub status: PaymentStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl ChargeResponse {
    pub fn paid(transaction_id: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Paid,
            message: None,
            transaction_id: Some(transaction_id.into()),
        }
    }

    pub fn declined(message: Option<String>) -> Self {
        Self {
            status: PaymentStatus::Declined,
            message,
            transaction_id: None,
        }
    }
}

/// Errors raised while talking to the payment service.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Connection, timeout or body decoding failure.
    #[error("Payment transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Payment service returned HTTP {0}")]
    Status(u16),

    /// The service answered 2xx with an empty body.
    #[error("Payment service returned no response body")]
    EmptyResponse,

    /// The service could not be used for any other reason.
    #[error("Payment service unavailable: {0}")]
    Unavailable(String),
}

/// Trait for charging customers.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a customer once. No retries.
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResponse, PaymentError>;
}

/// Payment gateway backed by the payment service's REST API.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    charge_url: String,
}

impl HttpPaymentGateway {
    /// Creates a gateway for the service at `base_url`, e.g. `http://localhost:8081`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            charge_url: format!("{}/api/payments/charge", base_url.trim_end_matches('/')),
        }
    }

    pub fn charge_url(&self) -> &str {
        &self.charge_url
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self, request), fields(order_reference = %request.order_reference, amount = %request.amount))]
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResponse, PaymentError> {
        let response = self
            .client
            .post(&self.charge_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "payment service returned error status");
            return Err(PaymentError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(PaymentError::EmptyResponse);
        }

        serde_json::from_slice(&body).map_err(|e| {
            PaymentError::Unavailable(format!("undecodable payment response: {e}"))
        })
    }
}

/// What [`InMemoryPaymentGateway`] answers to the next charges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Answer `PAID` with a generated transaction id.
    Paid,
    /// Answer `DECLINED` with the given message.
    Declined(Option<String>),
    /// Fail as if the service could not be reached.
    Unavailable,
}

#[derive(Debug)]
struct InMemoryPaymentState {
    outcome: ScriptedOutcome,
    charges: Vec<ChargeRequest>,
    next_id: u32,
}

/// In-memory payment gateway for testing and for running without a payment service.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<InMemoryPaymentState>>,
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self::with_outcome(ScriptedOutcome::Paid)
    }
}

impl InMemoryPaymentGateway {
    /// Creates a gateway that accepts every charge.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(outcome: ScriptedOutcome) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryPaymentState {
                outcome,
                charges: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Changes the answer to subsequent charges.
    pub async fn set_outcome(&self, outcome: ScriptedOutcome) {
        self.state.lock().await.outcome = outcome;
    }

    /// Returns every charge request received so far, oldest first.
    pub async fn charges(&self) -> Vec<ChargeRequest> {
        self.state.lock().await.charges.clone()
    }

    pub async fn charge_count(&self) -> usize {
        self.state.lock().await.charges.len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResponse, PaymentError> {
        let mut state = self.state.lock().await;
        state.charges.push(request);

        match state.outcome.clone() {
            ScriptedOutcome::Paid => {
                state.next_id += 1;
                Ok(ChargeResponse::paid(format!("TX-{:04}", state.next_id)))
            }
            ScriptedOutcome::Declined(message) => Ok(ChargeResponse::declined(message)),
            ScriptedOutcome::Unavailable => Err(PaymentError::Unavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_charge_request_wire_format() {
        let correlation_id = CorrelationId::new();
        let request =
            ChargeRequest::new(Money::new(dec!(25.50)), correlation_id, "ada@example.com");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount"], serde_json::json!(25.5));
        assert_eq!(json["currency"], "EUR");
        assert_eq!(json["orderReference"], correlation_id.to_string());
        assert_eq!(json["customerEmail"], "ada@example.com");
        assert_eq!(json["method"], "CREDIT_CARD");
    }

    #[test]
    fn test_charge_response_parsing() {
        let paid: ChargeResponse =
            serde_json::from_str(r#"{"status":"PAID","transactionId":"T-1"}"#).unwrap();
        assert!(paid.status.is_paid());
        assert_eq!(paid.transaction_id.as_deref(), Some("T-1"));
        assert_eq!(paid.message, None);

        let failed: ChargeResponse =
            serde_json::from_str(r#"{"status":"FAILED","message":"card expired"}"#).unwrap();
        assert_eq!(failed.status, PaymentStatus::Other("FAILED".to_string()));
        assert!(!failed.status.is_paid());
        assert_eq!(failed.message.as_deref(), Some("card expired"));
    }

    #[test]
    fn test_charge_url_joins_base() {
        let gateway = HttpPaymentGateway::new("http://payments:8081/");
        assert_eq!(
            gateway.charge_url(),
            "http://payments:8081/api/payments/charge"
        );
    }

    #[tokio::test]
    async fn test_in_memory_gateway_outcomes() {
        let gateway = InMemoryPaymentGateway::new();
        let request = ChargeRequest::new(Money::from_cents(1000), CorrelationId::new(), "a@b.c");

        let r1 = gateway.charge(request.clone()).await.unwrap();
        let r2 = gateway.charge(request.clone()).await.unwrap();
        assert_eq!(r1.transaction_id.as_deref(), Some("TX-0001"));
        assert_eq!(r2.transaction_id.as_deref(), Some("TX-0002"));

        gateway
            .set_outcome(ScriptedOutcome::Declined(Some("Insufficient funds".to_string())))
            .await;
        let declined = gateway.charge(request.clone()).await.unwrap();
        assert_eq!(declined.status, PaymentStatus::Declined);
        assert_eq!(declined.message.as_deref(), Some("Insufficient funds"));

        gateway.set_outcome(ScriptedOutcome::Unavailable).await;
        assert!(matches!(
            gateway.charge(request).await,
            Err(PaymentError::Unavailable(_))
        ));
        assert_eq!(gateway.charge_count().await, 4);
    }
}
