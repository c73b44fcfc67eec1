//! Document renderer: a pure function from notice fields to a letter.

use std::sync::{Arc, RwLock};

use domain::{Document, NoticeFields};
use thiserror::Error;

/// Errors that can occur while rendering a notice.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A field the document cannot be produced without is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Failure injected by the in-memory test renderer.
    #[error("render failed: {0}")]
    Failed(String),
}

/// Trait for turning structured notice fields into an opaque document.
///
/// Pure: implementations hold no external state and perform no I/O.
pub trait DocumentRenderer: Send + Sync {
    /// Renders the notice.
    fn render(&self, fields: &NoticeFields) -> Result<Document, RenderError>;
}

/// Renders the preliminary-notice letter as self-contained HTML.
#[derive(Debug, Clone, Default)]
pub struct HtmlNoticeRenderer;

impl HtmlNoticeRenderer {
    /// Creates a new renderer.
    pub fn new() -> Self {
        Self
    }

    fn require<'a>(value: &'a str, field: &'static str) -> Result<&'a str, RenderError> {
        if value.trim().is_empty() {
            return Err(RenderError::MissingField(field));
        }
        Ok(value)
    }
}

impl DocumentRenderer for HtmlNoticeRenderer {
    fn render(&self, fields: &NoticeFields) -> Result<Document, RenderError> {
        let sender_name = Self::require(&fields.sender_name, "sender_name")?;
        let sender_address = Self::require(&fields.sender_address, "sender_address")?;
        let sender_role = Self::require(&fields.sender_role, "sender_role")?;
        let owner_name = Self::require(&fields.owner_name, "owner_name")?;
        let owner_address = Self::require(&fields.owner_address, "owner_address")?;
        let job_description = Self::require(&fields.job_description, "job_description")?;
        let job_site_address = Self::require(&fields.job_site_address, "job_site_address")?;
        let estimated_price = Self::require(&fields.estimated_price, "estimated_price")?;

        let lender_section = match fields.lender_name.as_deref() {
            Some(lender) if !lender.trim().is_empty() => {
                format!("<p><strong>Construction Lender:</strong> {lender}</p>")
            }
            _ => String::new(),
        };

        let html = format!(
            r#"<html>
<body style="font-family: serif; font-size: 12pt;">
  <h1 style="text-align: center;">PRELIMINARY NOTICE</h1>
  <p style="text-align: right;">{date}</p>
  <p><strong>To (Property Owner):</strong><br>{owner_name}<br>{owner_address}</p>
  <p><strong>From ({sender_role}):</strong><br>{sender_name}<br>{sender_address}</p>
  {lender_section}
  <p><strong>Job Site:</strong> {job_site_address}</p>
  <p><strong>Description of Labor, Services, Equipment, or Materials:</strong><br>{job_description}</p>
  <p><strong>Estimated Total Price:</strong> {estimated_price}</p>
  <p>This is NOT a lien. This notice is given pursuant to statute to preserve
  the claimant's right to record a lien should payment not be made.</p>
</body>
</html>"#,
            date = fields.date,
        );

        Ok(Document::from_html(html))
    }
}

#[derive(Debug, Default)]
struct InMemoryRendererState {
    render_count: u32,
    fail_on_render: bool,
}

/// In-memory renderer for testing: produces a fixed tiny document, or
/// fails on demand.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRenderer {
    state: Arc<RwLock<InMemoryRendererState>>,
}

impl InMemoryRenderer {
    /// Creates a new in-memory renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the renderer to fail every render call.
    pub fn set_fail_on_render(&self, fail: bool) {
        self.state.write().unwrap().fail_on_render = fail;
    }

    /// Returns the number of successful renders.
    pub fn render_count(&self) -> u32 {
        self.state.read().unwrap().render_count
    }
}

impl DocumentRenderer for InMemoryRenderer {
    fn render(&self, fields: &NoticeFields) -> Result<Document, RenderError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_render {
            return Err(RenderError::Failed("injected render failure".to_string()));
        }
        state.render_count += 1;
        Ok(Document::from_html(format!(
            "<p>notice for {}</p>",
            fields.owner_name
        )))
    }
}
