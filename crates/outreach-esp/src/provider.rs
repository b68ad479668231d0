//! Known email service provider identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Email service provider a sender is configured with.
///
/// The identifier is stored on every sender record as a plain string; parsing it
/// into this enum is the first step of routing a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Twilio SendGrid.
    #[serde(rename = "sendgrid")]
    SendGrid,
    /// Mailgun.
    Mailgun,
    /// Postmark.
    Postmark,
    /// Brevo (formerly Sendinblue).
    Brevo,
    /// Elastic Email.
    ElasticEmail,
    /// Mailjet.
    Mailjet,
}

impl Provider {
    /// All known providers.
    pub const ALL: [Self; 6] = [
        Self::SendGrid,
        Self::Mailgun,
        Self::Postmark,
        Self::Brevo,
        Self::ElasticEmail,
        Self::Mailjet,
    ];

    /// Identifier as stored on sender records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SendGrid => "sendgrid",
            Self::Mailgun => "mailgun",
            Self::Postmark => "postmark",
            Self::Brevo => "brevo",
            Self::ElasticEmail => "elastic-email",
            Self::Mailjet => "mailjet",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a provider identifier is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown email service provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == normalized)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_identifiers() {
        assert_eq!("sendgrid".parse::<Provider>().unwrap(), Provider::SendGrid);
        assert_eq!(
            "elastic-email".parse::<Provider>().unwrap(),
            Provider::ElasticEmail
        );
        assert_eq!("mailjet".parse::<Provider>().unwrap(), Provider::Mailjet);
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(" SendGrid ".parse::<Provider>().unwrap(), Provider::SendGrid);
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = "carrier-pigeon".parse::<Provider>().unwrap_err();
        assert_eq!(err, UnknownProvider("carrier-pigeon".to_string()));
    }

    #[test]
    fn display_matches_stored_identifier() {
        for provider in Provider::ALL {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
    }
}
