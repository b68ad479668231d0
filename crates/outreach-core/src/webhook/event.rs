//! Provider webhook items and their classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::message::{DeliveryEventType, MessageKind, OutboundId};

/// A raw item of a provider event batch.
///
/// Only the fields the pipeline reads are modelled; everything else the
/// provider sends is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderEvent {
    /// Provider event name (`delivered`, `open`, `bounce`, ...).
    pub event: String,
    /// Correlation id echoed from the send metadata.
    #[serde(
        rename = "referenceId",
        alias = "reference_id",
        deserialize_with = "string_or_number"
    )]
    pub correlation_id: String,
    /// Outbound stream echoed from the send metadata.
    #[serde(rename = "type")]
    pub message_type: MessageKind,
    /// Unix seconds.
    pub timestamp: i64,
    /// RFC 5322 Message-ID of the sent mail.
    #[serde(rename = "smtp-id", default)]
    pub smtp_id: Option<String>,
    /// Provider-internal message id.
    #[serde(default)]
    pub sg_message_id: Option<String>,
    /// Sender id echoed from the send metadata.
    #[serde(
        rename = "senderId",
        default,
        deserialize_with = "optional_string_or_number"
    )]
    pub sender_id: Option<String>,
}

impl ProviderEvent {
    /// Provider message id, preferring `smtp-id`. Empty values count as absent.
    #[must_use]
    pub fn provider_message_id(&self) -> Option<&str> {
        [&self.smtp_id, &self.sg_message_id]
            .into_iter()
            .filter_map(Option::as_deref)
            .map(str::trim)
            .find(|id| !id.is_empty())
    }

    /// Classify the item.
    ///
    /// Returns `None` when the item has no effect at all: its name maps to no
    /// delivery event and it is neither a bounce nor a spam report.
    #[must_use]
    pub fn classify(&self) -> Option<ClassifiedEvent> {
        let classification = classify(&self.event);
        if classification.is_noop() {
            return None;
        }

        // Out-of-range times fall back to the receive time; the event still counts
        let occurred_at = DateTime::from_timestamp(self.timestamp, 0).unwrap_or_else(|| {
            warn!(
                "Event {} for {} has out-of-range timestamp {}; using receive time",
                self.event, self.correlation_id, self.timestamp
            );
            Utc::now()
        });

        Some(ClassifiedEvent {
            key: GroupKey::new(OutboundId::new(&self.correlation_id), self.message_type),
            event_type: classification.event_type,
            occurred_at,
            bounced: classification.bounced,
            spam_reported: classification.spam_reported,
            provider_message_id: self.provider_message_id().map(String::from),
        })
    }
}

/// Identifies the message an event targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// Correlation id.
    pub correlation_id: OutboundId,
    /// Outbound stream.
    pub kind: MessageKind,
}

impl GroupKey {
    /// Create a key.
    #[must_use]
    pub const fn new(correlation_id: OutboundId, kind: MessageKind) -> Self {
        Self {
            correlation_id,
            kind,
        }
    }
}

/// What a provider event name means for a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// Delivery event to record, if any.
    pub event_type: Option<DeliveryEventType>,
    /// The message bounced.
    pub bounced: bool,
    /// The recipient reported spam.
    pub spam_reported: bool,
}

impl Classification {
    /// Whether the classification changes nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.event_type.is_none() && !self.bounced && !self.spam_reported
    }
}

/// Map a provider event name to its effect.
#[must_use]
pub fn classify(name: &str) -> Classification {
    let event_type = match name {
        "processed" => Some(DeliveryEventType::Processed),
        "delivered" => Some(DeliveryEventType::Delivered),
        "open" => Some(DeliveryEventType::Opened),
        "click" => Some(DeliveryEventType::Clicked),
        _ => None,
    };

    Classification {
        event_type,
        bounced: matches!(name, "dropped" | "bounce"),
        spam_reported: name == "spamreport",
    }
}

/// A classified item ready for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    /// Target message.
    pub key: GroupKey,
    /// Delivery event to record, if any.
    pub event_type: Option<DeliveryEventType>,
    /// When the provider observed the event.
    pub occurred_at: DateTime<Utc>,
    /// Bounce signal.
    pub bounced: bool,
    /// Spam-report signal.
    pub spam_reported: bool,
    /// Provider message id carried by the item.
    pub provider_message_id: Option<String>,
}

/// Result of parsing and classifying a batch body.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    /// Items with an effect, in arrival order.
    pub events: Vec<ClassifiedEvent>,
    /// Number of items in the batch.
    pub received: usize,
    /// Items that could not be parsed.
    pub skipped: usize,
    /// Parsed items with no effect.
    pub ignored: usize,
}

/// Parse a batch body and classify each item.
///
/// A malformed item is skipped without affecting the rest of the batch.
///
/// # Errors
///
/// Returns an error if the body is not a JSON array.
pub fn parse_batch(body: &str) -> serde_json::Result<ParsedBatch> {
    let items: Vec<Value> = serde_json::from_str(body)?;
    let mut batch = ParsedBatch {
        received: items.len(),
        ..ParsedBatch::default()
    };

    for (index, item) in items.into_iter().enumerate() {
        let event = match serde_json::from_value::<ProviderEvent>(item) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed webhook item {index}: {e}");
                batch.skipped += 1;
                continue;
            }
        };

        match event.classify() {
            Some(classified) => batch.events.push(classified),
            None => {
                debug!(
                    "Ignoring '{}' event for {} {}",
                    event.event, event.message_type, event.correlation_id
                );
                batch.ignored += 1;
            }
        }
    }

    Ok(batch)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
