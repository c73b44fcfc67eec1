//! Payment gateway trait with in-memory and Square-backed implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{IdempotencyKey, Money, PaymentRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SQUARE_SANDBOX_BASE: &str = "https://connect.squareupsandbox.com";
const SQUARE_PRODUCTION_BASE: &str = "https://connect.squareup.com";

/// Errors a payment gateway can return.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The instrument was declined. User-fixable; never retried by the
    /// system.
    #[error("payment declined: {0}")]
    Declined(String),

    /// A refund attempt failed. The single escalating failure mode.
    #[error("refund failed: {0}")]
    RefundFailed(String),

    /// Gateway-side failure unrelated to the instrument.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    /// Network-level failure reaching the gateway.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Trait for payment operations.
///
/// Each call carries a fresh [`IdempotencyKey`]: a retried charge or refund
/// is a new attempt, never a replay of a prior one.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a single-use payment instrument token.
    async fn charge(
        &self,
        token: &str,
        amount: Money,
        key: IdempotencyKey,
        customer_email: &str,
    ) -> Result<PaymentRef, PaymentError>;

    /// Refunds a previously made charge, in full.
    async fn refund(
        &self,
        payment_ref: &PaymentRef,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<(), PaymentError>;
}

/// A refund recorded by the in-memory gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRefund {
    pub payment_ref: PaymentRef,
    pub amount: Money,
    pub key: IdempotencyKey,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: HashMap<PaymentRef, Money>,
    refunds: Vec<RecordedRefund>,
    charge_keys: Vec<IdempotencyKey>,
    refund_attempts: u32,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Configures the gateway to fail every refund.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Returns the number of successful charges.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().charges.len()
    }

    /// Returns the number of refund attempts, successful or not.
    pub fn refund_attempts(&self) -> u32 {
        self.state.read().unwrap().refund_attempts
    }

    /// Returns every successful refund.
    pub fn refunds(&self) -> Vec<RecordedRefund> {
        self.state.read().unwrap().refunds.clone()
    }

    /// Returns the charged amount for a payment reference, if it exists
    /// and has not been refunded.
    pub fn charged_amount(&self, payment_ref: &PaymentRef) -> Option<Money> {
        self.state.read().unwrap().charges.get(payment_ref).copied()
    }

    /// Returns every idempotency key seen on charge calls.
    pub fn charge_keys(&self) -> Vec<IdempotencyKey> {
        self.state.read().unwrap().charge_keys.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(
        &self,
        _token: &str,
        amount: Money,
        key: IdempotencyKey,
        _customer_email: &str,
    ) -> Result<PaymentRef, PaymentError> {
        let mut state = self.state.write().unwrap();
        state.charge_keys.push(key);

        if state.fail_on_charge {
            return Err(PaymentError::Declined("card declined".to_string()));
        }

        state.next_id += 1;
        let payment_ref = PaymentRef::new(format!("PAY-{:04}", state.next_id));
        state.charges.insert(payment_ref.clone(), amount);
        Ok(payment_ref)
    }

    async fn refund(
        &self,
        payment_ref: &PaymentRef,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<(), PaymentError> {
        let mut state = self.state.write().unwrap();
        state.refund_attempts += 1;

        if state.fail_on_refund {
            return Err(PaymentError::RefundFailed("gateway unavailable".to_string()));
        }

        state.charges.remove(payment_ref);
        state.refunds.push(RecordedRefund {
            payment_ref: payment_ref.clone(),
            amount,
            key,
        });
        Ok(())
    }
}

// -- Square wire types --

#[derive(Serialize)]
struct SquareMoney {
    amount: i64,
    currency: &'static str,
}

#[derive(Serialize)]
struct CreatePaymentRequest<'a> {
    source_id: &'a str,
    idempotency_key: String,
    amount_money: SquareMoney,
    buyer_email_address: &'a str,
    note: &'static str,
}

#[derive(Serialize)]
struct RefundPaymentRequest<'a> {
    idempotency_key: String,
    payment_id: &'a str,
    amount_money: SquareMoney,
    reason: &'static str,
}

#[derive(Deserialize)]
struct PaymentResponse {
    payment: Option<PaymentBody>,
    #[serde(default)]
    errors: Vec<SquareErrorBody>,
}

#[derive(Deserialize)]
struct PaymentBody {
    id: String,
}

#[derive(Deserialize)]
struct RefundResponse {
    #[serde(default)]
    errors: Vec<SquareErrorBody>,
}

#[derive(Deserialize)]
struct SquareErrorBody {
    #[serde(default)]
    category: String,
    #[serde(default)]
    detail: String,
}

/// Payment gateway backed by the Square Payments API.
#[derive(Clone)]
pub struct SquarePaymentGateway {
    access_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl SquarePaymentGateway {
    /// Creates a gateway against the sandbox or production environment.
    pub fn new(access_token: impl Into<String>, production: bool) -> Self {
        let base = if production {
            SQUARE_PRODUCTION_BASE
        } else {
            SQUARE_SANDBOX_BASE
        };
        Self {
            access_token: access_token.into(),
            base_url: base.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the base URL, for tests against a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn classify(errors: &[SquareErrorBody], fallback: &str) -> PaymentError {
        if let Some(err) = errors.first() {
            // Card-level rejections are the user's to fix; everything else
            // is a gateway failure.
            if err.category == "PAYMENT_METHOD_ERROR" {
                return PaymentError::Declined(err.detail.clone());
            }
            return PaymentError::Gateway(err.detail.clone());
        }
        PaymentError::Gateway(fallback.to_string())
    }
}

#[async_trait]
impl PaymentGateway for SquarePaymentGateway {
    async fn charge(
        &self,
        token: &str,
        amount: Money,
        key: IdempotencyKey,
        customer_email: &str,
    ) -> Result<PaymentRef, PaymentError> {
        let request = CreatePaymentRequest {
            source_id: token,
            idempotency_key: key.to_string(),
            amount_money: SquareMoney {
                amount: amount.cents(),
                currency: "USD",
            },
            buyer_email_address: customer_email,
            note: "Notice service fee",
        };

        let response = self
            .client
            .post(format!("{}/v2/payments", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: PaymentResponse = response.json().await?;

        if !status.is_success() {
            return Err(Self::classify(
                &body.errors,
                &format!("payment rejected with status {status}"),
            ));
        }

        let payment = body
            .payment
            .ok_or_else(|| PaymentError::Gateway("charge succeeded but returned no payment id".to_string()))?;

        Ok(PaymentRef::new(payment.id))
    }

    async fn refund(
        &self,
        payment_ref: &PaymentRef,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<(), PaymentError> {
        let request = RefundPaymentRequest {
            idempotency_key: key.to_string(),
            payment_id: payment_ref.as_str(),
            amount_money: SquareMoney {
                amount: amount.cents(),
                currency: "USD",
            },
            reason: "System error - document not dispatched",
        };

        let response = self
            .client
            .post(format!("{}/v2/refunds", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: RefundResponse = response.json().await.unwrap_or(RefundResponse {
                errors: Vec::new(),
            });
            let detail = body
                .errors
                .first()
                .map(|e| e.detail.clone())
                .unwrap_or_else(|| format!("refund rejected with status {status}"));
            return Err(PaymentError::RefundFailed(detail));
        }
        Ok(())
    }
}
