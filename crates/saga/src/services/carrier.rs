//! Carrier dispatcher trait with in-memory and Lob-backed implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::TrackingRef;
use domain::{Document, PostalAddress, ServiceLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LOB_ENDPOINT: &str = "https://api.lob.com/v1/letters";

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// The carrier's tracking reference.
    pub tracking_ref: TrackingRef,
    /// URL of the proof document (the rendered letter as the carrier
    /// accepted it).
    pub proof_url: String,
}

/// Errors a carrier dispatch can return.
///
/// Address rejections are kept apart from system failures so the caller
/// can tell the user to fix their input instead of showing a generic
/// error.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The carrier rejected the address. User-fixable.
    #[error("{user_message}")]
    Address {
        /// The carrier's machine-readable code.
        code: String,
        /// The friendly fix-it message shown to the user.
        user_message: String,
    },

    /// Carrier-side failure unrelated to the address.
    #[error("carrier error: {0}")]
    System(String),

    /// Network-level failure reaching the carrier.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DispatchError {
    /// Returns true if the end user can fix this by correcting their input.
    pub fn is_user_fixable(&self) -> bool {
        matches!(self, DispatchError::Address { .. })
    }
}

/// Translates a carrier validation code into a user-facing address error.
///
/// Unknown validation codes fall back to a generic verify-your-input
/// message rather than leaking the raw carrier response.
pub fn map_carrier_error(code: &str, original_message: &str) -> DispatchError {
    let user_message = match code {
        "failed_deliverability_strictness" => {
            "We could not verify this address exists. Please double-check the street number and spelling."
        }
        "invalid_address" => {
            "The address format is incorrect. Please ensure you have a valid City, State, and Zip."
        }
        "address_length_exceeds_limit" => {
            "The address line is too long (max 40 chars). Please abbreviate (e.g., 'St' instead of 'Street')."
        }
        "rate_limit_exceeded" => {
            "We are sending too many requests at once. Please wait a moment and try again."
        }
        _ => {
            tracing::debug!(code, original_message, "unmapped carrier validation code");
            "The mail carrier rejected this request. Please verify the information is correct."
        }
    };
    DispatchError::Address {
        code: code.to_string(),
        user_message: user_message.to_string(),
    }
}

/// Trait for handing a rendered document to the physical-mail carrier.
#[async_trait]
pub trait CarrierDispatcher: Send + Sync {
    /// Dispatches a document and returns the carrier's receipt.
    async fn dispatch(
        &self,
        document: &Document,
        to: &PostalAddress,
        from: &PostalAddress,
        service_level: ServiceLevel,
    ) -> Result<DispatchReceipt, DispatchError>;
}

/// A dispatch recorded by the in-memory dispatcher.
#[derive(Debug, Clone)]
pub struct RecordedDispatch {
    pub to: PostalAddress,
    pub service_level: ServiceLevel,
}

#[derive(Debug, Default)]
enum FailMode {
    #[default]
    None,
    System,
    Address(String),
}

#[derive(Debug, Default)]
struct InMemoryCarrierState {
    dispatches: Vec<RecordedDispatch>,
    next_id: u32,
    fail_mode: FailMode,
}

/// In-memory carrier dispatcher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarrierDispatcher {
    state: Arc<RwLock<InMemoryCarrierState>>,
}

impl InMemoryCarrierDispatcher {
    /// Creates a new in-memory carrier dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the dispatcher to fail with a system error.
    pub fn set_fail_with_system(&self) {
        self.state.write().unwrap().fail_mode = FailMode::System;
    }

    /// Configures the dispatcher to reject the address with the given
    /// carrier code.
    pub fn set_fail_with_address(&self, code: &str) {
        self.state.write().unwrap().fail_mode = FailMode::Address(code.to_string());
    }

    /// Returns the number of successful dispatches.
    pub fn dispatch_count(&self) -> usize {
        self.state.read().unwrap().dispatches.len()
    }

    /// Returns every successful dispatch.
    pub fn dispatches(&self) -> Vec<RecordedDispatch> {
        self.state.read().unwrap().dispatches.clone()
    }
}

#[async_trait]
impl CarrierDispatcher for InMemoryCarrierDispatcher {
    async fn dispatch(
        &self,
        _document: &Document,
        to: &PostalAddress,
        _from: &PostalAddress,
        service_level: ServiceLevel,
    ) -> Result<DispatchReceipt, DispatchError> {
        let mut state = self.state.write().unwrap();
        match &state.fail_mode {
            FailMode::System => {
                return Err(DispatchError::System("carrier unavailable".to_string()));
            }
            FailMode::Address(code) => {
                let code = code.clone();
                return Err(map_carrier_error(&code, "address rejected"));
            }
            FailMode::None => {}
        }

        state.next_id += 1;
        state.dispatches.push(RecordedDispatch {
            to: to.clone(),
            service_level,
        });
        Ok(DispatchReceipt {
            tracking_ref: TrackingRef::new(format!("9407-{:010}", state.next_id)),
            proof_url: format!("https://assets.carrier.test/letters/{}.pdf", state.next_id),
        })
    }
}

// -- Lob wire types --

#[derive(Serialize)]
struct LobAddress<'a> {
    name: &'a str,
    address_line1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address_line2: Option<&'a str>,
    address_city: &'a str,
    address_state: &'a str,
    address_zip: &'a str,
    address_country: &'static str,
}

impl<'a> LobAddress<'a> {
    fn from_postal(addr: &'a PostalAddress) -> Self {
        Self {
            name: &addr.name,
            address_line1: &addr.line1,
            address_line2: addr.line2.as_deref(),
            address_city: &addr.city,
            address_state: &addr.state,
            address_zip: &addr.zip,
            address_country: "US",
        }
    }
}

#[derive(Serialize)]
struct LetterRequest<'a> {
    description: &'a str,
    to: LobAddress<'a>,
    from: LobAddress<'a>,
    color: bool,
    file: &'a str,
    extra_service: &'static str,
}

#[derive(Deserialize)]
struct LetterResponse {
    tracking_number: String,
    url: String,
}

#[derive(Deserialize, Default)]
struct LobErrorResponse {
    #[serde(default)]
    error: LobErrorBody,
}

#[derive(Deserialize, Default)]
struct LobErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: String,
}

/// Carrier dispatcher backed by the Lob letters API.
#[derive(Clone)]
pub struct LobCarrierDispatcher {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl LobCarrierDispatcher {
    /// Creates a dispatcher with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: LOB_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the API endpoint, for tests against a local stub.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CarrierDispatcher for LobCarrierDispatcher {
    async fn dispatch(
        &self,
        document: &Document,
        to: &PostalAddress,
        from: &PostalAddress,
        service_level: ServiceLevel,
    ) -> Result<DispatchReceipt, DispatchError> {
        let request = LetterRequest {
            description: "Preliminary notice",
            to: LobAddress::from_postal(to),
            from: LobAddress::from_postal(from),
            color: false,
            file: document.as_html(),
            extra_service: service_level.as_str(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            // Lob authenticates with the API key as the basic-auth username.
            .basic_auth(&self.api_key, None::<&str>)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: LobErrorResponse = response.json().await.unwrap_or_default();
            if status.as_u16() == 422 && !body.error.code.is_empty() {
                return Err(map_carrier_error(&body.error.code, &body.error.message));
            }
            return Err(DispatchError::System(format!(
                "carrier rejected request (status {status}): {}",
                body.error.message
            )));
        }

        let letter: LetterResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::System(format!("response decoding error: {e}")))?;

        Ok(DispatchReceipt {
            tracking_ref: TrackingRef::new(letter.tracking_number),
            proof_url: letter.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> PostalAddress {
        PostalAddress {
            name: "Jane Owner".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Fresno".to_string(),
            state: "CA".to_string(),
            zip: "93650".to_string(),
        }
    }

    #[tokio::test]
    async fn dispatch_returns_tracking_and_proof() {
        let carrier = InMemoryCarrierDispatcher::new();
        let receipt = carrier
            .dispatch(
                &Document::from_html("<p>notice</p>"),
                &address(),
                &address(),
                ServiceLevel::Certified,
            )
            .await
            .unwrap();

        assert!(receipt.tracking_ref.as_str().starts_with("9407-"));
        assert!(receipt.proof_url.ends_with(".pdf"));
        assert_eq!(carrier.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn address_failure_is_user_fixable() {
        let carrier = InMemoryCarrierDispatcher::new();
        carrier.set_fail_with_address("invalid_address");

        let err = carrier
            .dispatch(
                &Document::from_html("<p>notice</p>"),
                &address(),
                &address(),
                ServiceLevel::Certified,
            )
            .await
            .unwrap_err();

        assert!(err.is_user_fixable());
        assert!(err.to_string().contains("City, State, and Zip"));
        assert_eq!(carrier.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn system_failure_is_not_user_fixable() {
        let carrier = InMemoryCarrierDispatcher::new();
        carrier.set_fail_with_system();

        let err = carrier
            .dispatch(
                &Document::from_html("<p>notice</p>"),
                &address(),
                &address(),
                ServiceLevel::Certified,
            )
            .await
            .unwrap_err();

        assert!(!err.is_user_fixable());
    }

    #[test]
    fn unknown_carrier_code_gets_generic_message() {
        let err = map_carrier_error("some_new_code", "raw detail");
        match err {
            DispatchError::Address { code, user_message } => {
                assert_eq!(code, "some_new_code");
                assert!(user_message.contains("verify the information"));
            }
            other => panic!("expected address error, got {other:?}"),
        }
    }
}
