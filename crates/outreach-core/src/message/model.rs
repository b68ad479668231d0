//! Outbound message model types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageKind;
use crate::sender::SenderId;

/// Correlation id of an email or follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutboundId(pub String);

impl OutboundId {
    /// Create an outbound ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutboundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored email or follow-up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Correlation id.
    pub id: OutboundId,
    /// Outbound stream.
    pub kind: MessageKind,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
    /// Recipient contact.
    pub contact_id: String,
    /// Sender the message went out from.
    pub sender_id: SenderId,
    /// Email a follow-up is threaded onto. Always `None` for emails.
    pub parent_email_id: Option<OutboundId>,
    /// Provider-assigned message id, set by the first event that carries one.
    pub message_id: Option<String>,
    /// Sticky bounce flag.
    pub is_bounced: bool,
    /// Sticky spam-report flag.
    pub is_spam_reported: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Fields for storing a new outbound message.
#[derive(Debug, Clone)]
pub struct NewOutboundMessage {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
    /// Recipient contact.
    pub contact_id: String,
    /// Sender the message goes out from.
    pub sender_id: SenderId,
    /// Parent email, for follow-ups.
    pub parent_email_id: Option<OutboundId>,
}

impl NewOutboundMessage {
    /// A first-touch email.
    #[must_use]
    pub fn email(
        subject: impl Into<String>,
        body: impl Into<String>,
        contact_id: impl Into<String>,
        sender_id: SenderId,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            contact_id: contact_id.into(),
            sender_id,
            parent_email_id: None,
        }
    }

    /// A follow-up threaded onto `parent`.
    #[must_use]
    pub fn follow_up(
        subject: impl Into<String>,
        body: impl Into<String>,
        contact_id: impl Into<String>,
        sender_id: SenderId,
        parent: OutboundId,
    ) -> Self {
        Self {
            parent_email_id: Some(parent),
            ..Self::email(subject, body, contact_id, sender_id)
        }
    }
}

/// Lifecycle event recorded against a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryEventType {
    /// Accepted by the provider.
    Processed,
    /// Accepted by the receiving server.
    Delivered,
    /// Opened by the recipient.
    Opened,
    /// A link was clicked.
    Clicked,
}

impl DeliveryEventType {
    /// Stored name of the event type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Delivered => "delivered",
            Self::Opened => "opened",
            Self::Clicked => "clicked",
        }
    }
}

impl fmt::Display for DeliveryEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "delivered" => Ok(Self::Delivered),
            "opened" => Ok(Self::Opened),
            "clicked" => Ok(Self::Clicked),
            other => Err(format!("unknown delivery event type: {other}")),
        }
    }
}

/// A stored delivery event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEvent {
    /// Row id; increases in append order.
    pub id: i64,
    /// Message the event belongs to.
    pub message_id: OutboundId,
    /// Event type.
    pub event_type: DeliveryEventType,
    /// When the provider observed the event.
    pub occurred_at: DateTime<Utc>,
    /// When the event was stored.
    pub created_at: DateTime<Utc>,
}

/// An event to append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewDeliveryEvent {
    /// Event type.
    pub event_type: DeliveryEventType,
    /// When the provider observed the event.
    pub occurred_at: DateTime<Utc>,
}

impl NewDeliveryEvent {
    /// Create an event.
    #[must_use]
    pub const fn new(event_type: DeliveryEventType, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_type,
            occurred_at,
        }
    }
}

/// Combined state change for one message, applied in a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryUpdate {
    /// Events to append, in order.
    pub events: Vec<NewDeliveryEvent>,
    /// OR-ed into the bounce flag.
    pub bounced: bool,
    /// OR-ed into the spam flag.
    pub spam_reported: bool,
    /// Stored only if the message has no provider id yet.
    pub provider_message_id: Option<String>,
}

impl DeliveryUpdate {
    /// Whether any event in the update is a delivery.
    #[must_use]
    pub fn has_delivered(&self) -> bool {
        self.events
            .iter()
            .any(|e| e.event_type == DeliveryEventType::Delivered)
    }

    /// Whether applying the update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && !self.bounced
            && !self.spam_reported
            && self.provider_message_id.is_none()
    }
}
