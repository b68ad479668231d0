//! Applies aggregated groups to the message and sender stores.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::aggregate::AggregatedGroup;
use crate::Result;
use crate::db::Database;
use crate::message::MessageRepository;
use crate::sender::SenderRepository;

/// Default number of groups reconciled at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// What happened to one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// The message was updated.
    Reconciled {
        /// The sender's `sent_count` was incremented.
        delivered: bool,
    },
    /// No message matches the group's correlation id and type.
    Unmatched,
    /// A store write failed.
    Failed,
}

/// Totals over a set of groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Groups applied to a message.
    pub reconciled: usize,
    /// Groups with no matching message.
    pub unmatched: usize,
    /// Groups whose write failed.
    pub failed: usize,
    /// Groups that incremented a sender's `sent_count`.
    pub delivered: usize,
}

impl ReconcileSummary {
    fn record(&mut self, outcome: GroupOutcome) {
        match outcome {
            GroupOutcome::Reconciled { delivered } => {
                self.reconciled += 1;
                if delivered {
                    self.delivered += 1;
                }
            }
            GroupOutcome::Unmatched => self.unmatched += 1,
            GroupOutcome::Failed => self.failed += 1,
        }
    }
}

/// Writes aggregated groups with a bounded worker pool.
///
/// Each group touches exactly one message, so groups are independent and may
/// run in any order. Ordering within a message comes from the group itself.
#[derive(Debug, Clone)]
pub struct Reconciler {
    messages: MessageRepository,
    senders: SenderRepository,
    concurrency: usize,
}

impl Reconciler {
    /// Create a reconciler over `db`'s stores.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            messages: db.messages(),
            senders: db.senders(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the worker pool bound. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Apply one group.
    ///
    /// The message update is one transaction. The `sent_count` increment
    /// follows it as a separate relative update, once per group with a
    /// delivery, no matter how many delivered items the group merged.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails. If only the increment fails
    /// the message update stays applied.
    pub async fn reconcile_group(&self, group: &AggregatedGroup) -> Result<GroupOutcome> {
        let key = &group.key;
        let Some(sender_id) = self
            .messages
            .apply_delivery_update(key.kind, &key.correlation_id, &group.update)
            .await?
        else {
            warn!(
                "No {} found for correlation id {}; dropping {} event(s)",
                key.kind,
                key.correlation_id,
                group.update.events.len()
            );
            return Ok(GroupOutcome::Unmatched);
        };

        let delivered = group.update.has_delivered();
        if delivered && !self.senders.increment_sent_count(&sender_id).await? {
            warn!(
                "Sender {sender_id} of {} {} no longer exists; sent count not updated",
                key.kind, key.correlation_id
            );
        }

        debug!(
            "Reconciled {} {} (delivered: {delivered})",
            key.kind, key.correlation_id
        );
        Ok(GroupOutcome::Reconciled { delivered })
    }

    /// Apply all groups, at most `concurrency` at a time.
    ///
    /// A failing group is logged and counted; it never stops the others.
    pub async fn reconcile_all(&self, groups: Vec<AggregatedGroup>) -> ReconcileSummary {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for group in groups {
            let reconciler = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return GroupOutcome::Failed;
                };
                match reconciler.reconcile_group(&group).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(
                            "Failed to reconcile {} {}: {e}",
                            group.key.kind, group.key.correlation_id
                        );
                        GroupOutcome::Failed
                    }
                }
            });
        }

        let mut summary = ReconcileSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    error!("Reconcile task aborted: {e}");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
