//! Provider event webhook pipeline.
//!
//! A batch moves through four stages:
//!
//! 1. **Origin check** - the request's user agent must match the provider
//! 2. **Archive** - the raw body is written to the audit log before anything
//!    else reads it
//! 3. **Classify and aggregate** - items become bounce/spam flags and delivery
//!    events, merged per `(correlation id, message type)`
//! 4. **Reconcile** - each group is applied to its message in one transaction,
//!    and a delivery bumps the owning sender's `sent_count` once
//!
//! The per-group `sent_count` rule only dedupes within one batch. A provider
//! redelivering the same `delivered` event in a later batch is counted again.

mod aggregate;
mod event;
mod ingest;
mod reconcile;

pub use aggregate::{AggregatedGroup, aggregate};
pub use event::{
    Classification, ClassifiedEvent, GroupKey, ParsedBatch, ProviderEvent, classify, parse_batch,
};
pub use ingest::{
    BatchReport, IngestOutcome, SENDGRID_PLATFORM, SENDGRID_USER_AGENT, WebhookConfig,
    WebhookIngestor,
};
pub use reconcile::{DEFAULT_CONCURRENCY, GroupOutcome, ReconcileSummary, Reconciler};
