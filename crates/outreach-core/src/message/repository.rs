//! Outbound message storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;
use uuid::Uuid;

use super::MessageKind;
use super::model::{
    DeliveryEvent, DeliveryEventType, DeliveryUpdate, NewOutboundMessage, OutboundId,
    OutboundMessage,
};
use crate::db::parse_timestamp;
use crate::sender::SenderId;
use crate::{Error, Result};

/// Table names for one outbound stream.
struct Tables {
    messages: &'static str,
    events: &'static str,
    event_parent: &'static str,
    parent_select: &'static str,
}

const fn tables(kind: MessageKind) -> Tables {
    match kind {
        MessageKind::Email => Tables {
            messages: "emails",
            events: "email_events",
            event_parent: "email_id",
            parent_select: "NULL AS email_id",
        },
        MessageKind::FollowUp => Tables {
            messages: "follow_ups",
            events: "follow_up_events",
            event_parent: "follow_up_id",
            parent_select: "email_id",
        },
    }
}

/// Repository for emails, follow-ups and their event history.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a repository on an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new email or follow-up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] if a follow-up has no existing parent
    /// email or an email names one, or an error if the insert fails.
    pub async fn create(
        &self,
        kind: MessageKind,
        message: &NewOutboundMessage,
    ) -> Result<OutboundMessage> {
        let id = OutboundId::new(Uuid::new_v4().to_string());
        let now = Utc::now();

        match (kind, &message.parent_email_id) {
            (MessageKind::Email, None) => {
                sqlx::query(
                    r"
                    INSERT INTO emails (
                        id, subject, body, message_id, contact_id, sender_id,
                        is_bounced, is_spam_reported, created_at, updated_at
                    ) VALUES (?, ?, ?, NULL, ?, ?, 0, 0, ?, ?)
                    ",
                )
                .bind(&id.0)
                .bind(&message.subject)
                .bind(&message.body)
                .bind(&message.contact_id)
                .bind(&message.sender_id.0)
                .bind(now.to_rfc3339())
                .bind(now.to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            (MessageKind::FollowUp, Some(parent)) => {
                if self.get(MessageKind::Email, parent).await?.is_none() {
                    return Err(Error::InvalidMessage(format!(
                        "parent email {parent} does not exist"
                    )));
                }

                sqlx::query(
                    r"
                    INSERT INTO follow_ups (
                        id, email_id, subject, body, message_id, contact_id, sender_id,
                        is_bounced, is_spam_reported, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, NULL, ?, ?, 0, 0, ?, ?)
                    ",
                )
                .bind(&id.0)
                .bind(&parent.0)
                .bind(&message.subject)
                .bind(&message.body)
                .bind(&message.contact_id)
                .bind(&message.sender_id.0)
                .bind(now.to_rfc3339())
                .bind(now.to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            (MessageKind::Email, Some(_)) => {
                return Err(Error::InvalidMessage(
                    "an email cannot have a parent email".into(),
                ));
            }
            (MessageKind::FollowUp, None) => {
                return Err(Error::InvalidMessage(
                    "a follow-up requires a parent email".into(),
                ));
            }
        }

        debug!("Created {kind} {id}");

        Ok(OutboundMessage {
            id,
            kind,
            subject: message.subject.clone(),
            body: message.body.clone(),
            contact_id: message.contact_id.clone(),
            sender_id: message.sender_id.clone(),
            parent_email_id: message.parent_email_id.clone(),
            message_id: None,
            is_bounced: false,
            is_spam_reported: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a message by kind and correlation id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, kind: MessageKind, id: &OutboundId) -> Result<Option<OutboundMessage>> {
        let t = tables(kind);
        let sql = format!(
            r"
            SELECT id, {parent}, subject, body, message_id, contact_id, sender_id,
                   is_bounced, is_spam_reported, created_at, updated_at
            FROM {table}
            WHERE id = ?
            ",
            parent = t.parent_select,
            table = t.messages,
        );

        let row = sqlx::query(&sql)
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_message(&r, kind)).transpose()
    }

    /// Event history of a message, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a stored event type is
    /// unknown.
    pub async fn events(&self, kind: MessageKind, id: &OutboundId) -> Result<Vec<DeliveryEvent>> {
        let t = tables(kind);
        let sql = format!(
            r"
            SELECT id, {parent} AS parent_id, event_type, occurred_at, created_at
            FROM {table}
            WHERE {parent} = ?
            ORDER BY id
            ",
            parent = t.event_parent,
            table = t.events,
        );

        let rows = sqlx::query(&sql)
            .bind(&id.0)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_event).collect()
    }

    /// Apply one message's combined delivery update atomically.
    ///
    /// Bounce and spam flags are OR-ed in and never cleared, the provider
    /// message id is only written while unset, and events are appended in
    /// order. All of it commits or none of it does.
    ///
    /// Returns the owning sender, or `None` if no such message exists (in which
    /// case nothing is written).
    ///
    /// # Errors
    ///
    /// Returns an error if any statement or the commit fails.
    pub async fn apply_delivery_update(
        &self,
        kind: MessageKind,
        id: &OutboundId,
        update: &DeliveryUpdate,
    ) -> Result<Option<SenderId>> {
        let t = tables(kind);
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // Write first: a read-then-write upgrade under contention fails with
        // SQLITE_BUSY without waiting on the busy timeout.
        let update_sql = format!(
            r"
            UPDATE {}
            SET is_bounced = (is_bounced OR ?),
                is_spam_reported = (is_spam_reported OR ?),
                message_id = COALESCE(message_id, ?),
                updated_at = ?
            WHERE id = ?
            RETURNING sender_id
            ",
            t.messages
        );
        let sender_id: Option<String> = sqlx::query_scalar(&update_sql)
            .bind(update.bounced)
            .bind(update.spam_reported)
            .bind(update.provider_message_id.as_deref())
            .bind(&now)
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(sender_id) = sender_id else {
            return Ok(None);
        };

        let insert_sql = format!(
            "INSERT INTO {} ({}, event_type, occurred_at, created_at) VALUES (?, ?, ?, ?)",
            t.events, t.event_parent
        );
        for event in &update.events {
            sqlx::query(&insert_sql)
                .bind(&id.0)
                .bind(event.event_type.as_str())
                .bind(event.occurred_at.to_rfc3339())
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            "Applied {} event(s) to {kind} {id} (bounced: {}, spam: {})",
            update.events.len(),
            update.bounced,
            update.spam_reported
        );

        Ok(Some(SenderId(sender_id)))
    }
}

/// Convert a database row to an OutboundMessage.
fn row_to_message(row: &SqliteRow, kind: MessageKind) -> Result<OutboundMessage> {
    Ok(OutboundMessage {
        id: OutboundId(row.get("id")),
        kind,
        subject: row.get("subject"),
        body: row.get("body"),
        contact_id: row.get("contact_id"),
        sender_id: SenderId(row.get("sender_id")),
        parent_email_id: row.get::<Option<String>, _>("email_id").map(OutboundId),
        message_id: row.get("message_id"),
        is_bounced: row.get::<i64, _>("is_bounced") != 0,
        is_spam_reported: row.get::<i64, _>("is_spam_reported") != 0,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

/// Convert a database row to a DeliveryEvent.
fn row_to_event(row: &SqliteRow) -> Result<DeliveryEvent> {
    let event_type: &str = row.get("event_type");
    let event_type = event_type
        .parse::<DeliveryEventType>()
        .map_err(Error::CorruptRecord)?;

    Ok(DeliveryEvent {
        id: row.get("id"),
        message_id: OutboundId(row.get("parent_id")),
        event_type,
        occurred_at: parse_timestamp(row.get("occurred_at"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}
