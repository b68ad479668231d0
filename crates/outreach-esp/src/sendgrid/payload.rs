//! SendGrid v3 `mail/send` request body.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{CustomArgs, FollowUpEmail, MessageKind, OutgoingEmail, SenderProfile};

/// Content type used for every message body.
const HTML_CONTENT_TYPE: &str = "text/html";

/// `mail/send` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailSend {
    /// Recipients with their per-recipient metadata.
    pub personalizations: Vec<Personalization>,
    /// From address.
    pub from: EmailAddress,
    /// Subject line.
    pub subject: String,
    /// Message bodies.
    pub content: Vec<Content>,
    /// Extra message headers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// One recipient block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Personalization {
    /// Recipient addresses.
    pub to: Vec<EmailAddress>,
    /// Metadata echoed back in event webhooks.
    pub custom_args: CustomArgs,
}

/// Address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    /// Mailbox address.
    pub email: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A message body part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    /// MIME type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Body text.
    pub value: String,
}

impl MailSend {
    /// Builds the request for one message of a bulk send.
    #[must_use]
    pub fn email(from: &SenderProfile, message: &OutgoingEmail) -> Self {
        Self::build(
            from,
            &message.to,
            &message.subject,
            &message.html_body,
            CustomArgs {
                kind: MessageKind::Email,
                sender_id: from.id.clone(),
                reference_id: message.correlation_id.clone(),
            },
        )
    }

    /// Builds the request for a follow-up, threaded with `In-Reply-To` and
    /// `References` set to the original provider message id.
    #[must_use]
    pub fn follow_up(from: &SenderProfile, message: &FollowUpEmail) -> Self {
        let mut mail = Self::build(
            from,
            &message.to,
            &message.subject,
            &message.html_body,
            CustomArgs {
                kind: MessageKind::FollowUp,
                sender_id: from.id.clone(),
                reference_id: message.correlation_id.clone(),
            },
        );
        mail.headers
            .insert("In-Reply-To".to_string(), message.in_reply_to.clone());
        mail.headers
            .insert("References".to_string(), message.in_reply_to.clone());
        mail
    }

    fn build(
        from: &SenderProfile,
        to: &str,
        subject: &str,
        html_body: &str,
        custom_args: CustomArgs,
    ) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: to.to_string(),
                    name: None,
                }],
                custom_args,
            }],
            from: EmailAddress {
                email: from.email.clone(),
                name: Some(from.name.clone()),
            },
            subject: subject.to_string(),
            content: vec![Content {
                content_type: HTML_CONTENT_TYPE.to_string(),
                value: html_body.to_string(),
            }],
            headers: BTreeMap::new(),
        }
    }
}
