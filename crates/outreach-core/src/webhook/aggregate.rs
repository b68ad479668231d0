//! Per-message aggregation of a classified batch.

use std::collections::HashMap;

use super::event::{ClassifiedEvent, GroupKey};
use crate::message::{DeliveryUpdate, NewDeliveryEvent};

/// Everything a batch says about one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedGroup {
    /// Target message.
    pub key: GroupKey,
    /// Merged update to apply.
    pub update: DeliveryUpdate,
}

impl AggregatedGroup {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            update: DeliveryUpdate::default(),
        }
    }

    fn merge(&mut self, event: ClassifiedEvent) {
        if let Some(event_type) = event.event_type {
            self.update
                .events
                .push(NewDeliveryEvent::new(event_type, event.occurred_at));
        }
        self.update.bounced |= event.bounced;
        self.update.spam_reported |= event.spam_reported;
        if self.update.provider_message_id.is_none() {
            self.update.provider_message_id = event.provider_message_id;
        }
    }
}

/// Group classified events by target message.
///
/// Groups come out in order of first appearance; events within a group keep
/// arrival order.
#[must_use]
pub fn aggregate(events: impl IntoIterator<Item = ClassifiedEvent>) -> Vec<AggregatedGroup> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<AggregatedGroup> = Vec::new();

    for event in events {
        let slot = *index.entry(event.key.clone()).or_insert_with(|| {
            groups.push(AggregatedGroup::new(event.key.clone()));
            groups.len() - 1
        });
        groups[slot].merge(event);
    }

    groups
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::message::{DeliveryEventType, MessageKind, OutboundId};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn event(id: &str, kind: MessageKind, ty: Option<DeliveryEventType>, ts: i64) -> ClassifiedEvent {
        ClassifiedEvent {
            key: GroupKey::new(OutboundId::new(id), kind),
            event_type: ty,
            occurred_at: at(ts),
            bounced: false,
            spam_reported: false,
            provider_message_id: None,
        }
    }

    #[test]
    fn groups_by_correlation_id_and_kind() {
        let groups = aggregate([
            event("e1", MessageKind::Email, Some(DeliveryEventType::Processed), 100),
            event("e1", MessageKind::FollowUp, Some(DeliveryEventType::Processed), 101),
            event("e2", MessageKind::Email, Some(DeliveryEventType::Opened), 102),
            event("e1", MessageKind::Email, Some(DeliveryEventType::Delivered), 103),
        ]);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key.correlation_id, OutboundId::new("e1"));
        assert_eq!(groups[0].key.kind, MessageKind::Email);
        assert_eq!(groups[1].key.kind, MessageKind::FollowUp);
        assert_eq!(groups[2].key.correlation_id, OutboundId::new("e2"));

        let types: Vec<_> = groups[0].update.events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![DeliveryEventType::Processed, DeliveryEventType::Delivered]
        );
        assert_eq!(groups[0].update.events[1].occurred_at, at(103));
    }

    #[test]
    fn flags_are_or_ed_across_the_group() {
        let mut bounce = event("e1", MessageKind::Email, None, 100);
        bounce.bounced = true;
        let mut spam = event("e1", MessageKind::Email, None, 101);
        spam.spam_reported = true;

        let groups = aggregate([
            bounce,
            event("e1", MessageKind::Email, Some(DeliveryEventType::Opened), 102),
            spam,
        ]);

        assert_eq!(groups.len(), 1);
        assert!(groups[0].update.bounced);
        assert!(groups[0].update.spam_reported);
        assert_eq!(groups[0].update.events.len(), 1);
    }

    #[test]
    fn first_provider_message_id_wins() {
        let first = event("e1", MessageKind::Email, Some(DeliveryEventType::Processed), 100);
        let mut second = event("e1", MessageKind::Email, Some(DeliveryEventType::Delivered), 101);
        second.provider_message_id = Some("<a@sendgrid.net>".into());
        let mut third = event("e1", MessageKind::Email, Some(DeliveryEventType::Opened), 102);
        third.provider_message_id = Some("<b@sendgrid.net>".into());

        let groups = aggregate([first, second, third]);
        assert_eq!(
            groups[0].update.provider_message_id.as_deref(),
            Some("<a@sendgrid.net>")
        );
    }

    #[test]
    fn duplicate_deliveries_stay_in_one_group() {
        let groups = aggregate([
            event("e1", MessageKind::Email, Some(DeliveryEventType::Delivered), 100),
            event("e1", MessageKind::Email, Some(DeliveryEventType::Delivered), 100),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].update.events.len(), 2);
        assert!(groups[0].update.has_delivered());
    }

    #[test]
    fn empty_input() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
