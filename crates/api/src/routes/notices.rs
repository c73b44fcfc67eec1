//! The pay-and-send endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use channels::{EmailChannel, OperatorAlert};
use lead_store::LeadStore;
use saga::{
    CarrierDispatcher, DocumentRenderer, NoticeRequest, PaymentGateway, SagaCoordinator,
    SagaOutcome,
};
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<P, C, R, L, E, A>
where
    P: PaymentGateway,
    C: CarrierDispatcher,
    R: DocumentRenderer,
    L: LeadStore,
    E: EmailChannel + Clone + 'static,
    A: OperatorAlert,
{
    pub saga: SagaCoordinator<P, C, R, L, E, A>,
    pub leads: L,
    pub alerts: A,
}

/// What the client is told about one saga execution.
#[derive(Serialize)]
pub struct NoticeResponse {
    /// One of `delivered`, `payment_declined`, `refunded`, `refund_failed`.
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
}

/// POST /notices — charge, render, and dispatch one notice.
///
/// Every saga outcome is a meaningful response, so the status code comes
/// from the outcome rather than from an error path: a decline is `402`,
/// a refunded user mistake `422`, a refunded system failure `502`, and a
/// failed refund `500`.
#[tracing::instrument(skip(state, request), fields(customer = %request.customer_email))]
pub async fn create<P, C, R, L, E, A>(
    State(state): State<Arc<AppState<P, C, R, L, E, A>>>,
    Json(request): Json<NoticeRequest>,
) -> Result<(StatusCode, Json<NoticeResponse>), ApiError>
where
    P: PaymentGateway + 'static,
    C: CarrierDispatcher + 'static,
    R: DocumentRenderer + 'static,
    L: LeadStore + 'static,
    E: EmailChannel + Clone + 'static,
    A: OperatorAlert + 'static,
{
    if !request.customer_email.contains('@') {
        return Err(ApiError::BadRequest("invalid customer email".to_string()));
    }

    let outcome = state.saga.execute(request).await?;
    let message = outcome.user_message();

    let (status, response) = match outcome {
        SagaOutcome::Delivered {
            payment_ref,
            tracking_ref,
            proof_url,
        } => (
            StatusCode::OK,
            NoticeResponse {
                status: "delivered",
                message,
                payment_ref: Some(payment_ref.to_string()),
                tracking_ref: Some(tracking_ref.to_string()),
                proof_url: Some(proof_url),
            },
        ),
        SagaOutcome::PaymentDeclined { .. } => (
            StatusCode::PAYMENT_REQUIRED,
            NoticeResponse {
                status: "payment_declined",
                message,
                payment_ref: None,
                tracking_ref: None,
                proof_url: None,
            },
        ),
        SagaOutcome::Refunded { payment_ref, cause } => (
            if cause.is_user_fixable() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::BAD_GATEWAY
            },
            NoticeResponse {
                status: "refunded",
                message,
                payment_ref: Some(payment_ref.to_string()),
                tracking_ref: None,
                proof_url: None,
            },
        ),
        SagaOutcome::RefundFailed { payment_ref, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            NoticeResponse {
                status: "refund_failed",
                message,
                payment_ref: Some(payment_ref.to_string()),
                tracking_ref: None,
                proof_url: None,
            },
        ),
    };

    Ok((status, Json(response)))
}
