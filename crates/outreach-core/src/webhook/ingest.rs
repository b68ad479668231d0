//! Webhook batch ingestion: origin check, archive, classify, aggregate,
//! reconcile.

use serde::Serialize;
use tracing::{info, warn};

use super::aggregate::aggregate;
use super::event::parse_batch;
use super::reconcile::Reconciler;
use crate::Result;
use crate::audit::AuditLogRepository;
use crate::db::Database;

/// Platform name SendGrid batches are archived under.
pub const SENDGRID_PLATFORM: &str = "sendgrid";

/// User agent SendGrid's Event Webhook posts with.
pub const SENDGRID_USER_AGENT: &str = "SendGrid Event API";

/// Settings for one provider's webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Platform name recorded in the audit log.
    pub platform: String,
    /// Exact `User-Agent` the provider sends.
    pub expected_user_agent: String,
}

impl WebhookConfig {
    /// Create a config.
    #[must_use]
    pub fn new(platform: impl Into<String>, expected_user_agent: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            expected_user_agent: expected_user_agent.into(),
        }
    }

    /// SendGrid defaults.
    #[must_use]
    pub fn sendgrid() -> Self {
        Self::new(SENDGRID_PLATFORM, SENDGRID_USER_AGENT)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self::sendgrid()
    }
}

/// Counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Items in the batch.
    pub received: usize,
    /// Malformed items.
    pub skipped: usize,
    /// Items with no effect.
    pub ignored: usize,
    /// Distinct messages referenced.
    pub groups: usize,
    /// Messages updated.
    pub reconciled: usize,
    /// Groups with no matching message.
    pub unmatched: usize,
    /// Groups whose write failed.
    pub failed: usize,
    /// Groups that incremented a sender's sent count.
    pub delivered_groups: usize,
}

/// Result of [`WebhookIngestor::ingest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Origin check failed; nothing was written.
    Rejected,
    /// Body was archived but is not a JSON array.
    Malformed(String),
    /// Batch was archived and processed.
    Accepted(BatchReport),
}

/// Entry point for provider event batches.
#[derive(Debug, Clone)]
pub struct WebhookIngestor {
    config: WebhookConfig,
    audit: AuditLogRepository,
    reconciler: Reconciler,
}

impl WebhookIngestor {
    /// Create an ingestor over `db` with the given reconciler.
    #[must_use]
    pub fn new(config: WebhookConfig, db: &Database, reconciler: Reconciler) -> Self {
        Self {
            config,
            audit: db.audit_log(),
            reconciler,
        }
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Whether a request's user agent matches the provider.
    #[must_use]
    pub fn is_trusted(&self, user_agent: Option<&str>) -> bool {
        user_agent == Some(self.config.expected_user_agent.as_str())
    }

    /// Process one batch body.
    ///
    /// A request with the wrong user agent is rejected before anything is
    /// written. Otherwise the body is archived verbatim first, then
    /// classified, grouped per message and reconciled. Individual bad items
    /// and failed groups are counted in the report, not returned as errors.
    ///
    /// # Errors
    ///
    /// Returns an error only if archiving the body fails.
    pub async fn ingest(&self, user_agent: Option<&str>, body: &str) -> Result<IngestOutcome> {
        if !self.is_trusted(user_agent) {
            warn!(
                "Rejected {} webhook from user agent {:?}",
                self.config.platform, user_agent
            );
            return Ok(IngestOutcome::Rejected);
        }

        self.audit.record(&self.config.platform, body).await?;

        let batch = match parse_batch(body) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Archived {} webhook body is not an event array: {e}", self.config.platform);
                return Ok(IngestOutcome::Malformed(e.to_string()));
            }
        };

        let groups = aggregate(batch.events);
        let group_count = groups.len();
        let summary = self.reconciler.reconcile_all(groups).await;

        let report = BatchReport {
            received: batch.received,
            skipped: batch.skipped,
            ignored: batch.ignored,
            groups: group_count,
            reconciled: summary.reconciled,
            unmatched: summary.unmatched,
            failed: summary.failed,
            delivered_groups: summary.delivered,
        };

        info!(
            "Processed {} webhook: {} item(s), {} group(s), {} reconciled, {} unmatched, {} failed",
            self.config.platform,
            report.received,
            report.groups,
            report.reconciled,
            report.unmatched,
            report.failed
        );

        Ok(IngestOutcome::Accepted(report))
    }
}
