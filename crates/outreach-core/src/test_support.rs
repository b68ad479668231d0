//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::LazyLock;

use crate::db::Database;
use crate::message::{MessageKind, NewOutboundMessage, OutboundMessage};
use crate::sender::{NewSender, Sender};
use crate::vault::CredentialVault;

pub const VAULT_SECRET: &str = "test-encryption-secret";

static VAULT: LazyLock<CredentialVault> =
    LazyLock::new(|| CredentialVault::new(VAULT_SECRET).expect("test vault"));

static OTHER_VAULT: LazyLock<CredentialVault> =
    LazyLock::new(|| CredentialVault::new("a-different-secret").expect("other test vault"));

pub fn vault() -> &'static CredentialVault {
    &VAULT
}

pub fn other_vault() -> &'static CredentialVault {
    &OTHER_VAULT
}

pub fn new_sender(esp: &str) -> NewSender {
    NewSender {
        display_name: "Outreach Team".to_string(),
        name: "Team".to_string(),
        email: "team@example.com".to_string(),
        api_key: "SG.test-key".to_string(),
        esp: esp.to_string(),
        priority: 1,
        target: 100,
    }
}

pub async fn seed_sender(db: &Database) -> Sender {
    db.senders()
        .create(&new_sender("sendgrid"), vault())
        .await
        .unwrap()
}

pub async fn seed_email(db: &Database, sender: &Sender) -> OutboundMessage {
    db.messages()
        .create(
            MessageKind::Email,
            &NewOutboundMessage::email("Hello", "<p>Hello</p>", "contact-1", sender.id.clone()),
        )
        .await
        .unwrap()
}

pub async fn seed_follow_up(
    db: &Database,
    sender: &Sender,
    parent: &OutboundMessage,
) -> OutboundMessage {
    db.messages()
        .create(
            MessageKind::FollowUp,
            &NewOutboundMessage::follow_up(
                "Re: Hello",
                "<p>Bump</p>",
                "contact-1",
                sender.id.clone(),
                parent.id.clone(),
            ),
        )
        .await
        .unwrap()
}
