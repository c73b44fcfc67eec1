//! Operator alert channel with in-memory and webhook implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;

use crate::{ChannelError, Result};

/// Trait for best-effort human-attention alerts.
///
/// Used for events that need an operator's eyes: refund failures above
/// all, and new-lead pings. Callers log failures of this channel and
/// move on; nothing downstream depends on its result.
#[async_trait]
pub trait OperatorAlert: Send + Sync {
    /// Posts an alert.
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// An alert recorded by the in-memory channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAlert {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct InMemoryAlertState {
    alerts: Vec<RecordedAlert>,
    fail_on_notify: bool,
}

/// In-memory alert channel for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOperatorAlert {
    state: Arc<RwLock<InMemoryAlertState>>,
}

impl InMemoryOperatorAlert {
    /// Creates a new in-memory alert channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the channel to fail every notify call.
    pub fn set_fail_on_notify(&self, fail: bool) {
        self.state.write().unwrap().fail_on_notify = fail;
    }

    /// Returns every alert recorded so far.
    pub fn alerts(&self) -> Vec<RecordedAlert> {
        self.state.read().unwrap().alerts.clone()
    }

    /// Returns the number of recorded alerts.
    pub fn alert_count(&self) -> usize {
        self.state.read().unwrap().alerts.len()
    }
}

#[async_trait]
impl OperatorAlert for InMemoryOperatorAlert {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_notify {
            return Err(ChannelError::SendFailed("injected alert failure".to_string()));
        }
        state.alerts.push(RecordedAlert {
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookMessage {
    content: String,
}

/// Alert channel posting to a chat webhook (Discord-style `content` payload).
#[derive(Clone)]
pub struct WebhookOperatorAlert {
    webhook_url: String,
    client: reqwest::Client,
}

impl WebhookOperatorAlert {
    /// Creates a channel posting to `webhook_url`.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OperatorAlert for WebhookOperatorAlert {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let message = WebhookMessage {
            content: format!("**{subject}**\n{body}"),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "alert webhook rejected post");
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_alerts_in_order() {
        let alerts = InMemoryOperatorAlert::new();
        alerts.notify("first", "a").await.unwrap();
        alerts.notify("second", "b").await.unwrap();

        assert_eq!(alerts.alert_count(), 2);
        assert_eq!(alerts.alerts()[0].subject, "first");
        assert_eq!(alerts.alerts()[1].body, "b");
    }

    #[tokio::test]
    async fn injected_failure_records_nothing() {
        let alerts = InMemoryOperatorAlert::new();
        alerts.set_fail_on_notify(true);

        assert!(alerts.notify("s", "b").await.is_err());
        assert_eq!(alerts.alert_count(), 0);
    }
}
