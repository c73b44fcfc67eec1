//! Value objects describing a notice: its content, the postal addresses
//! it travels between, and the carrier service level.

use serde::{Deserialize, Serialize};

/// A US postal address as the carrier expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl PostalAddress {
    /// Single-line rendering used inside the notice document.
    pub fn single_line(&self) -> String {
        format!("{}, {}, {} {}", self.line1, self.city, self.state, self.zip)
    }
}

/// Structured content of a preliminary notice.
///
/// Pure data handed to the document renderer; the renderer holds no
/// state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeFields {
    /// Human-readable notice date, e.g. "January 2, 2026".
    pub date: String,
    pub sender_name: String,
    pub sender_address: String,
    /// e.g. "Subcontractor"
    pub sender_role: String,
    pub owner_name: String,
    pub owner_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender_name: Option<String>,
    pub job_description: String,
    pub job_site_address: String,
    pub estimated_price: String,
}

/// Carrier service level for a dispatched document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceLevel {
    /// Certified mail with a tracking number.
    Certified,
    /// Plain first-class mail, no tracking.
    FirstClass,
}

impl ServiceLevel {
    /// Returns the carrier wire value for this service level.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceLevel::Certified => "certified",
            ServiceLevel::FirstClass => "first_class",
        }
    }
}

/// An opaque rendered document ready for the carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    html: String,
}

impl Document {
    /// Wraps rendered HTML as a dispatchable document.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Returns the document body.
    pub fn as_html(&self) -> &str {
        &self.html
    }

    /// Returns the document size in bytes.
    pub fn len(&self) -> usize {
        self.html.len()
    }

    /// Returns true if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_single_line() {
        let addr = PostalAddress {
            name: "Jane Owner".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Fresno".to_string(),
            state: "CA".to_string(),
            zip: "93650".to_string(),
        };
        assert_eq!(addr.single_line(), "1 Main St, Fresno, CA 93650");
    }

    #[test]
    fn service_level_wire_values() {
        assert_eq!(ServiceLevel::Certified.as_str(), "certified");
        assert_eq!(ServiceLevel::FirstClass.as_str(), "first_class");
    }

    #[test]
    fn notice_fields_omit_absent_lender() {
        let fields = NoticeFields {
            date: "January 2, 2026".to_string(),
            sender_name: "Bob".to_string(),
            sender_address: "2 Side St, Fresno, CA 93650".to_string(),
            sender_role: "Subcontractor".to_string(),
            owner_name: "Jane".to_string(),
            owner_address: "1 Main St, Fresno, CA 93650".to_string(),
            lender_name: None,
            job_description: "Framing".to_string(),
            job_site_address: "1 Main St, Fresno, CA 93650".to_string(),
            estimated_price: "$12,000".to_string(),
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert!(json.get("lender_name").is_none());
    }
}
