//! The validated input to one saga execution.

use domain::{NoticeFields, PostalAddress};
use serde::{Deserialize, Serialize};

/// A fully-validated pay-and-send request.
///
/// Carries everything one saga execution needs. Note what it does NOT
/// carry: an amount. The price is the fixed product constant
/// [`NOTICE_PRICE`], never user input.
///
/// [`NOTICE_PRICE`]: crate::NOTICE_PRICE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeRequest {
    /// Structured content of the notice document.
    pub fields: NoticeFields,
    /// The property owner's verified address.
    pub to: PostalAddress,
    /// The sender's return address.
    pub from: PostalAddress,
    /// Single-use payment instrument token from the card form.
    pub payment_token: String,
    /// Customer email for receipt and audit.
    pub customer_email: String,
}
