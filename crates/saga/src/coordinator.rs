//! Saga coordinator orchestrating charge → render → dispatch with a
//! compensating refund.

use channels::{EmailChannel, OperatorAlert};
use chrono::Utc;
use common::{IdempotencyKey, Money};
use domain::{ServiceLevel, Transaction};
use lead_store::LeadStore;

use crate::error::{Result, SagaError};
use crate::outcome::{FailureCause, SagaOutcome};
use crate::request::NoticeRequest;
use crate::services::carrier::CarrierDispatcher;
use crate::services::payment::{PaymentError, PaymentGateway};
use crate::services::renderer::DocumentRenderer;

/// The fixed price of the product: $29.00.
///
/// The amount is never taken from the request, so a tampered client
/// cannot charge itself a different price.
pub const NOTICE_PRICE: Money = Money::from_cents(2900);

/// Orchestrates the execution of pay-and-send sagas.
///
/// The coordinator drives a 3-step saga (charge → render → dispatch) with
/// a compensating refund when a step after the charge fails. Steps are
/// strictly sequential; side effects that do not feed the outcome (receipt
/// email) are dispatched fire-and-forget after the authoritative result
/// is known.
pub struct SagaCoordinator<P, C, R, L, E, A>
where
    P: PaymentGateway,
    C: CarrierDispatcher,
    R: DocumentRenderer,
    L: LeadStore,
    E: EmailChannel,
    A: OperatorAlert,
{
    payment: P,
    carrier: C,
    renderer: R,
    leads: L,
    email: E,
    alerts: A,
}

impl<P, C, R, L, E, A> SagaCoordinator<P, C, R, L, E, A>
where
    P: PaymentGateway,
    C: CarrierDispatcher,
    R: DocumentRenderer,
    L: LeadStore,
    E: EmailChannel + Clone + 'static,
    A: OperatorAlert,
{
    /// Creates a new saga coordinator.
    pub fn new(payment: P, carrier: C, renderer: R, leads: L, email: E, alerts: A) -> Self {
        Self {
            payment,
            carrier,
            renderer,
            leads,
            email,
            alerts,
        }
    }

    /// Executes one pay-and-send saga.
    ///
    /// Exactly one charge attempt and at most one dispatch happen per
    /// call. Every business result, including declines and refund
    /// failures, is an [`SagaOutcome`]; `Err` means the request was not
    /// runnable and nothing was charged.
    #[tracing::instrument(skip(self, request), fields(customer = %request.customer_email))]
    pub async fn execute(&self, request: NoticeRequest) -> Result<SagaOutcome> {
        if request.payment_token.trim().is_empty() {
            return Err(SagaError::InvalidRequest(
                "missing payment token".to_string(),
            ));
        }

        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        // Step 1: Charge. A fresh idempotency key per attempt: a retried
        // saga is a new attempt, not a replay.
        let payment_ref = match self
            .payment
            .charge(
                &request.payment_token,
                NOTICE_PRICE,
                IdempotencyKey::fresh(),
                &request.customer_email,
            )
            .await
        {
            Ok(payment_ref) => payment_ref,
            Err(e) => {
                // Declines are reported, never retried; the user fixes
                // their card and submits a new saga.
                tracing::info!(error = %e, "charge declined");
                metrics::counter!("saga_declines_total").increment(1);
                return Ok(SagaOutcome::PaymentDeclined {
                    message: decline_message(&e),
                });
            }
        };

        let mut transaction =
            Transaction::charged(payment_ref, NOTICE_PRICE, &request.customer_email);
        tracing::info!(payment_ref = %transaction.payment_ref(), "charge succeeded");

        // Step 2: Render. The charge has already happened, so a render
        // failure owes the customer a refund.
        let document = match self.renderer.render(&request.fields) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(error = %e, "document render failed");
                let cause = FailureCause::System {
                    message: "System error: letter generation failed.".to_string(),
                };
                return self.compensate(transaction, cause).await;
            }
        };

        // Step 3: Dispatch.
        let receipt = match self
            .carrier
            .dispatch(&document, &request.to, &request.from, ServiceLevel::Certified)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(error = %e, "dispatch failed");
                let cause = if e.is_user_fixable() {
                    FailureCause::InvalidAddress {
                        message: e.to_string(),
                    }
                } else {
                    FailureCause::System {
                        message: "System error: the carrier could not accept the letter."
                            .to_string(),
                    }
                };
                return self.compensate(transaction, cause).await;
            }
        };

        // Step 5: Success. Dispatch is irreversible; from here on nothing
        // rolls back.
        transaction.mark_delivered()?;

        if let Err(e) = self.mark_customer_paid(&request).await {
            tracing::error!(
                error = %e,
                customer = %request.customer_email,
                payment_ref = %transaction.payment_ref(),
                "failed to persist paid flag after dispatch"
            );
        }
        self.send_receipt(&request, &receipt.tracking_ref.to_string());

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        metrics::counter!("saga_delivered_total").increment(1);
        tracing::info!(
            payment_ref = %transaction.payment_ref(),
            tracking_ref = %receipt.tracking_ref,
            duration,
            "saga completed"
        );

        Ok(SagaOutcome::Delivered {
            payment_ref: transaction.payment_ref().clone(),
            tracking_ref: receipt.tracking_ref,
            proof_url: receipt.proof_url,
        })
    }

    /// Runs the compensating refund: exactly one attempt, same amount as
    /// the charge, fresh idempotency key.
    ///
    /// A second refund attempt is deliberately never made; without an
    /// idempotency guarantee tied to the refund outcome, retrying risks a
    /// double refund.
    #[tracing::instrument(skip(self, transaction, cause), fields(payment_ref = %transaction.payment_ref()))]
    async fn compensate(
        &self,
        mut transaction: Transaction,
        cause: FailureCause,
    ) -> Result<SagaOutcome> {
        transaction.mark_refund_pending()?;
        let payment_ref = transaction.payment_ref().clone();

        match self
            .payment
            .refund(&payment_ref, transaction.amount(), IdempotencyKey::fresh())
            .await
        {
            Ok(()) => {
                transaction.mark_refunded()?;
                metrics::counter!("saga_refunds_total").increment(1);
                tracing::info!("charge refunded");
                Ok(SagaOutcome::Refunded { payment_ref, cause })
            }
            Err(e) => {
                transaction.mark_refund_failed()?;
                metrics::counter!("saga_refund_failures_total").increment(1);
                tracing::error!(
                    error = %e,
                    "CRITICAL: refund failed, charge without service; manual reconciliation required"
                );

                // The one escalation in the system. The alert itself is
                // best-effort, but its failure must never be silent.
                let body = format!(
                    "Charge without service. Refund failed for payment {payment_ref} \
                     ({amount}, customer {email}). Refund manually and reply to the customer.",
                    amount = transaction.amount(),
                    email = transaction.customer_email(),
                );
                if let Err(alert_err) = self
                    .alerts
                    .notify("REFUND FAILED - manual reconciliation required", &body)
                    .await
                {
                    tracing::error!(
                        error = %alert_err,
                        payment_ref = %payment_ref,
                        "operator alert for failed refund could not be delivered"
                    );
                }

                Ok(SagaOutcome::RefundFailed { payment_ref, cause })
            }
        }
    }

    /// Upserts the customer's lead row and flips `paid`, taking them out
    /// of the drip campaign for good.
    async fn mark_customer_paid(&self, request: &NoticeRequest) -> lead_store::Result<()> {
        self.leads
            .upsert_lead(&request.customer_email, &request.fields.sender_name, Utc::now())
            .await?;
        self.leads.mark_paid(&request.customer_email).await
    }

    /// Sends the receipt email as a fire-and-forget task. Its failure is
    /// logged and never affects the saga outcome.
    fn send_receipt(&self, request: &NoticeRequest, tracking_ref: &str) {
        let email = self.email.clone();
        let to = request.customer_email.clone();
        let body = format!(
            "<p>Your preliminary notice is on its way via certified mail.</p>\
             <p>Tracking number: <strong>{tracking_ref}</strong></p>"
        );
        tokio::spawn(async move {
            if let Err(e) = email.send(&to, "Your notice has been sent", &body).await {
                tracing::warn!(error = %e, to, "receipt email failed");
            }
        });
    }
}

/// The gateway message shown to the user on a failed charge.
fn decline_message(error: &PaymentError) -> String {
    match error {
        PaymentError::Declined(message) => message.clone(),
        other => other.to_string(),
    }
}
