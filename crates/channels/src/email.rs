//! Email channel trait with in-memory and Resend-backed implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;

use crate::{ChannelError, Result};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Trait for confirmed email delivery.
///
/// `send` returns only after the provider has accepted the message; an
/// `Ok` is the confirmation the campaign scheduler requires before it
/// advances a lead's step.
#[async_trait]
pub trait EmailChannel: Send + Sync {
    /// Sends an HTML email to a single recipient.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// A send recorded by the in-memory channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Default)]
struct InMemoryEmailState {
    sent: Vec<SentEmail>,
    fail_on_send: bool,
    fail_for: Vec<String>,
}

/// In-memory email channel for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailChannel {
    state: Arc<RwLock<InMemoryEmailState>>,
}

impl InMemoryEmailChannel {
    /// Creates a new in-memory email channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the channel to fail every send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Configures the channel to fail sends to one recipient only.
    pub fn set_fail_for(&self, to: &str) {
        self.state.write().unwrap().fail_for.push(to.to_string());
    }

    /// Returns every send confirmed so far.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the number of confirmed sends.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns the number of confirmed sends to one recipient.
    pub fn sent_count_to(&self, to: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .sent
            .iter()
            .filter(|e| e.to == to)
            .count()
    }
}

#[async_trait]
impl EmailChannel for InMemoryEmailChannel {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send || state.fail_for.iter().any(|f| f == to) {
            return Err(ChannelError::SendFailed(format!("injected failure for {to}")));
        }
        state.sent.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Email channel backed by the Resend HTTP API.
#[derive(Clone)]
pub struct ResendEmailChannel {
    api_key: String,
    from: String,
    endpoint: String,
    client: reqwest::Client,
}

impl ResendEmailChannel {
    /// Creates a channel sending as `from` (e.g. `"Acme <updates@acme.test>"`).
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            endpoint: RESEND_ENDPOINT.to_string(),
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
impl EmailChannel for ResendEmailChannel {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let body = ResendRequest {
            from: &self.from,
            to: [to],
            subject,
            html: html_body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), to, "email provider rejected send");
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
    async fn records_confirmed_sends() {
        let channel = InMemoryEmailChannel::new();
        channel.send("a@b.test", "Hi", "<p>Hi</p>").await.unwrap();
        channel.send("a@b.test", "Again", "<p>Hi</p>").await.unwrap();

        assert_eq!(channel.sent_count(), 2);
        assert_eq!(channel.sent_count_to("a@b.test"), 2);
        assert_eq!(channel.sent()[0].subject, "Hi");
    }

    #[tokio::test]
    async fn injected_failure_records_nothing() {
        let channel = InMemoryEmailChannel::new();
        channel.set_fail_on_send(true);

        let result = channel.send("a@b.test", "Hi", "<p>Hi</p>").await;
        assert!(result.is_err());
        assert_eq!(channel.sent_count(), 0);
    }

    #[tokio::test]
    async fn per_recipient_failure_leaves_others_working() {
        let channel = InMemoryEmailChannel::new();
        channel.set_fail_for("bad@b.test");

        assert!(channel.send("bad@b.test", "s", "b").await.is_err());
        channel.send("good@b.test", "s", "b").await.unwrap();
        assert_eq!(channel.sent_count(), 1);
    }
}
