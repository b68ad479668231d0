//! Sender model types.

use chrono::{DateTime, Utc};
use outreach_esp::SenderProfile;
use serde::{Deserialize, Serialize};

/// Unique identifier for a sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub String);

impl SenderId {
    /// Create a sender ID.
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

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mailbox outreach mail is sent from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    /// Unique identifier.
    pub id: SenderId,
    /// Name shown in the admin UI.
    pub display_name: String,
    /// From display name.
    pub name: String,
    /// From address.
    pub email: String,
    /// Provider API key, encrypted by the credential vault.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Provider identifier (e.g. `sendgrid`).
    pub esp: String,
    /// Scheduling priority.
    pub priority: i64,
    /// Target number of sends.
    pub target: i64,
    /// Lifetime count of delivered messages.
    pub sent_count: i64,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Sender {
    /// The identity passed to provider backends.
    #[must_use]
    pub fn profile(&self) -> SenderProfile {
        SenderProfile::new(self.id.0.clone(), self.email.clone(), self.name.clone())
    }
}

/// Fields for creating a sender.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSender {
    /// Name shown in the admin UI.
    pub display_name: String,
    /// From display name.
    pub name: String,
    /// From address.
    pub email: String,
    /// Plaintext provider API key; encrypted before it is stored.
    pub api_key: String,
    /// Provider identifier.
    pub esp: String,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: i64,
    /// Target number of sends.
    #[serde(default)]
    pub target: i64,
}
