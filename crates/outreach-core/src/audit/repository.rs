//! Webhook audit log repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;
use uuid::Uuid;

use crate::Result;
use crate::db::parse_timestamp;

/// A raw webhook body as it was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLog {
    /// Unique identifier.
    pub id: String,
    /// Provider that sent the webhook.
    pub platform: String,
    /// Request body, verbatim.
    pub body: String,
    /// Receive time.
    pub created_at: DateTime<Utc>,
}

/// Repository for the webhook audit log. Append-only.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    /// Create a repository on an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Archive a raw body.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn record(&self, platform: &str, body: &str) -> Result<WebhookLog> {
        let log = WebhookLog {
            id: Uuid::new_v4().to_string(),
            platform: platform.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO webhook_logs (id, platform, body, created_at) VALUES (?, ?, ?, ?)")
            .bind(&log.id)
            .bind(&log.platform)
            .bind(&log.body)
            .bind(log.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        debug!("Archived {} byte {platform} webhook as {}", body.len(), log.id);
        Ok(log)
    }

    /// All entries for a platform, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, platform: &str) -> Result<Vec<WebhookLog>> {
        let rows = sqlx::query(
            r"
            SELECT id, platform, body, created_at
            FROM webhook_logs
            WHERE platform = ?
            ORDER BY created_at, rowid
            ",
        )
        .bind(platform)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_log).collect()
    }
}

fn row_to_log(row: &SqliteRow) -> Result<WebhookLog> {
    Ok(WebhookLog {
        id: row.get("id"),
        platform: row.get("platform"),
        body: row.get("body"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_body_is_stored_verbatim() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.audit_log();
        let body = r#"[{"event":"delivered",  "referenceId":"e1"}]"#;

        let recorded = repo.record("sendgrid", body).await.unwrap();
        let listed = repo.list("sendgrid").await.unwrap();

        assert_eq!(listed, vec![recorded]);
        assert_eq!(listed[0].body, body);
    }

    #[tokio::test]
    async fn test_list_filters_by_platform() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.audit_log();

        repo.record("sendgrid", "first").await.unwrap();
        repo.record("mailgun", "other").await.unwrap();
        repo.record("sendgrid", "second").await.unwrap();

        let bodies: Vec<_> = repo
            .list("sendgrid")
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }
}
