//! The lead-capture endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use channels::{EmailChannel, OperatorAlert};
use chrono::Utc;
use lead_store::LeadStore;
use saga::{CarrierDispatcher, DocumentRenderer, PaymentGateway};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::notices::AppState;

#[derive(Deserialize)]
pub struct CaptureLeadRequest {
    pub email: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct CaptureLeadResponse {
    pub id: i64,
    pub email: String,
    pub campaign_step: u32,
}

/// POST /leads — upsert a lead by email and ping the operator channel.
///
/// Capturing the same email again is harmless: the name is refreshed and
/// campaign progress is untouched. The operator ping is fire-and-forget.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn capture<P, C, R, L, E, A>(
    State(state): State<Arc<AppState<P, C, R, L, E, A>>>,
    Json(request): Json<CaptureLeadRequest>,
) -> Result<(StatusCode, Json<CaptureLeadResponse>), ApiError>
where
    P: PaymentGateway + 'static,
    C: CarrierDispatcher + 'static,
    R: DocumentRenderer + 'static,
    L: LeadStore + 'static,
    E: EmailChannel + Clone + 'static,
    A: OperatorAlert + Clone + 'static,
{
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email".to_string()));
    }
    let name = request.name.trim().to_string();

    let lead = state.leads.upsert_lead(&email, &name, Utc::now()).await?;

    let alerts = state.alerts.clone();
    let ping = format!("{} <{}>", lead.name, lead.email);
    tokio::spawn(async move {
        if let Err(error) = alerts.notify("New lead captured", &ping).await {
            tracing::warn!(%error, "lead-capture alert failed");
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(CaptureLeadResponse {
            id: lead.id.as_i64(),
            email: lead.email,
            campaign_step: lead.campaign_step,
        }),
    ))
}
