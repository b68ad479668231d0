//! Provider-independent outgoing message types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which outbound stream a message belongs to.
///
/// Attached to every send as custom metadata and echoed back by the provider,
/// so webhook events can be routed to the email or follow-up store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// First-touch outreach email.
    #[serde(rename = "email")]
    Email,
    /// Follow-up threaded onto an earlier email.
    #[serde(rename = "followUp", alias = "follow-up", alias = "follow_up")]
    FollowUp,
}

impl MessageKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::FollowUp => "followUp",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decrypted provider API key.
///
/// Lives only for the duration of a single send call. `Debug` never prints the
/// secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a plaintext API key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the plaintext key for use in a request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Identity the message is sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderProfile {
    /// Sender record id, echoed back as `senderId`.
    pub id: String,
    /// From address.
    pub email: String,
    /// From display name.
    pub name: String,
}

impl SenderProfile {
    /// Creates a sender profile.
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Correlation metadata attached to each recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomArgs {
    /// Outbound stream.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Owning sender id.
    #[serde(rename = "senderId")]
    pub sender_id: String,
    /// Correlation id of the outbound message.
    #[serde(rename = "referenceId")]
    pub reference_id: String,
}

/// A single message of a bulk send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// Correlation id of the stored message.
    pub correlation_id: String,
}

impl OutgoingEmail {
    /// Creates an outgoing email.
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
            correlation_id: correlation_id.into(),
        }
    }
}

/// A follow-up threaded onto a previously delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// Correlation id of the stored follow-up.
    pub correlation_id: String,
    /// Provider message id of the original email (`In-Reply-To`/`References`).
    pub in_reply_to: String,
}

impl FollowUpEmail {
    /// Creates a follow-up threaded onto `in_reply_to`.
    #[must_use]
    pub fn new(email: OutgoingEmail, in_reply_to: impl Into<String>) -> Self {
        Self {
            to: email.to,
            subject: email.subject,
            html_body: email.html_body,
            correlation_id: email.correlation_id,
            in_reply_to: in_reply_to.into(),
        }
    }
}
