//! The provider backend interface.

use async_trait::async_trait;

use crate::provider::Provider;
use crate::types::{ApiKey, FollowUpEmail, OutgoingEmail, SenderProfile};

/// One implementation per email service provider.
///
/// The API key is passed on every call and never stored on the backend, so a
/// single backend instance can serve concurrent sends for different senders.
///
/// Both operations are fire-and-forget: provider and transport failures are
/// logged by the implementation and not returned. There is no retry or
/// dead-letter handling behind them.
#[async_trait]
pub trait EspBackend: Send + Sync {
    /// Provider this backend talks to.
    fn provider(&self) -> Provider;

    /// Sends a batch of first-touch emails from `from`.
    ///
    /// Each message carries `{type: "email", senderId, referenceId}` metadata.
    async fn send_bulk(&self, api_key: &ApiKey, from: &SenderProfile, messages: &[OutgoingEmail]);

    /// Sends one follow-up threaded onto the original provider message id.
    ///
    /// The message carries `{type: "followUp", senderId, referenceId}` metadata.
    async fn send_follow_up(&self, api_key: &ApiKey, from: &SenderProfile, message: &FollowUpEmail);
}
