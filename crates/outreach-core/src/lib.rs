//! # outreach-core
//!
//! Outbound delivery and event reconciliation for the outreach backend.
//!
//! This crate provides:
//! - **Credential Vault** - encryption at rest for per-sender provider API keys
//! - **ESP Router** - picks the provider backend for a sender and sends with its
//!   decrypted key
//! - **Webhook pipeline** - origin check, raw batch archiving, event
//!   classification, per-message aggregation and reconciliation
//! - **Stores** - `SQLite` persistence for senders, outbound messages with their
//!   delivery history, and the webhook audit log

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod audit;
mod db;
mod error;
pub mod message;
pub mod router;
pub mod sender;
pub mod vault;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit::{AuditLogRepository, WebhookLog};
pub use db::Database;
pub use error::{Error, Result};
pub use message::{
    DeliveryEvent, DeliveryEventType, DeliveryUpdate, MessageKind, MessageRepository,
    NewDeliveryEvent, NewOutboundMessage, OutboundId, OutboundMessage,
};
pub use router::{EspRouter, RouterError, RouterResult};
pub use sender::{NewSender, Sender, SenderId, SenderRepository};
pub use vault::{CredentialVault, VaultError, VaultResult};
pub use webhook::{
    AggregatedGroup, BatchReport, ClassifiedEvent, GroupKey, GroupOutcome, IngestOutcome,
    ProviderEvent, ReconcileSummary, Reconciler, WebhookConfig, WebhookIngestor,
};
