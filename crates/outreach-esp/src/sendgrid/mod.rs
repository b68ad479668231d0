//! SendGrid backend.
//!
//! Talks to the v3 `mail/send` endpoint. A `mail/send` request has a single
//! content block, so a bulk send issues one request per message, all of them
//! concurrently. The API key travels as a per-request bearer token; the
//! underlying HTTP client holds no credentials.

pub mod payload;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};

use crate::backend::EspBackend;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::types::{ApiKey, FollowUpEmail, OutgoingEmail, SenderProfile};
use payload::MailSend;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

/// Path of the send endpoint.
const MAIL_SEND_PATH: &str = "/v3/mail/send";

/// SendGrid implementation of [`EspBackend`].
#[derive(Debug, Clone)]
pub struct SendGridBackend {
    base_url: String,
    http_client: Client,
}

impl SendGridBackend {
    /// Creates a backend pointed at the production API.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: Client::new(),
        }
    }

    /// Overrides the API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Full URL of the send endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{MAIL_SEND_PATH}", self.base_url)
    }

    /// Posts one request, surfacing transport and status failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or SendGrid answers with
    /// a non-success status.
    pub async fn post(&self, api_key: &ApiKey, mail: &MailSend) -> Result<()> {
        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(api_key.expose())
            .json(mail)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl Default for SendGridBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EspBackend for SendGridBackend {
    fn provider(&self) -> Provider {
        Provider::SendGrid
    }

    async fn send_bulk(&self, api_key: &ApiKey, from: &SenderProfile, messages: &[OutgoingEmail]) {
        let requests = messages.iter().map(|message| async move {
            let mail = MailSend::email(from, message);
            (message, self.post(api_key, &mail).await)
        });

        let mut failed = 0usize;
        for (message, result) in join_all(requests).await {
            match result {
                Ok(()) => debug!(
                    "Queued email {} for {} via SendGrid",
                    message.correlation_id, message.to
                ),
                Err(e) => {
                    failed += 1;
                    warn!(
                        "Error sending email {} for sender {}: {e}",
                        message.correlation_id, from.id
                    );
                }
            }
        }

        debug!(
            "SendGrid bulk send for sender {} finished: {} sent, {failed} failed",
            from.id,
            messages.len() - failed
        );
    }

    async fn send_follow_up(&self, api_key: &ApiKey, from: &SenderProfile, message: &FollowUpEmail) {
        let mail = MailSend::follow_up(from, message);
        match self.post(api_key, &mail).await {
            Ok(()) => debug!(
                "Queued follow-up {} for {} via SendGrid",
                message.correlation_id, message.to
            ),
            Err(e) => warn!(
                "Error sending follow-up {} for sender {}: {e}",
                message.correlation_id, from.id
            ),
        }
    }
}
