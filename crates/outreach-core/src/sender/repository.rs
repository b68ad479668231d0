//! Sender storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;
use uuid::Uuid;

use super::model::{NewSender, Sender, SenderId};
use crate::db::parse_timestamp;
use crate::vault::CredentialVault;
use crate::{Error, Result};

/// Repository for sender storage and retrieval.
#[derive(Debug, Clone)]
pub struct SenderRepository {
    pool: SqlitePool,
}

impl SenderRepository {
    /// Create a repository on an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a sender, encrypting its API key with `vault`.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption or the insert fails.
    pub async fn create(&self, sender: &NewSender, vault: &CredentialVault) -> Result<Sender> {
        let id = SenderId::new(Uuid::new_v4().to_string());
        let encrypted_key = vault.encrypt(&sender.api_key)?;
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO senders (
                id, display_name, name, email, api_key, esp,
                priority, target, sent_count, is_deleted, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
            ",
        )
        .bind(&id.0)
        .bind(&sender.display_name)
        .bind(&sender.name)
        .bind(&sender.email)
        .bind(&encrypted_key)
        .bind(&sender.esp)
        .bind(sender.priority)
        .bind(sender.target)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Created sender {id} ({})", sender.esp);

        Ok(Sender {
            id,
            display_name: sender.display_name.clone(),
            name: sender.name.clone(),
            email: sender.email.clone(),
            api_key: encrypted_key,
            esp: sender.esp.clone(),
            priority: sender.priority,
            target: sender.target,
            sent_count: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a sender by ID. Soft-deleted senders are not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &SenderId) -> Result<Option<Sender>> {
        let row = sqlx::query(
            r"
            SELECT id, display_name, name, email, api_key, esp,
                   priority, target, sent_count, is_deleted, created_at, updated_at
            FROM senders
            WHERE id = ? AND is_deleted = 0
            ",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_sender).transpose()
    }

    /// Get a sender by ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SenderNotFound`] if there is no live sender with this ID.
    pub async fn require(&self, id: &SenderId) -> Result<Sender> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::SenderNotFound(id.to_string()))
    }

    /// Mark a sender as deleted.
    ///
    /// Returns `false` if no live sender had this ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn soft_delete(&self, id: &SenderId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE senders SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add one to the sender's lifetime `sent_count`.
    ///
    /// A single relative `UPDATE`, so concurrent increments never lose counts.
    /// Returns `false` if no sender had this ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn increment_sent_count(&self, id: &SenderId) -> Result<bool> {
        let result = sqlx::query("UPDATE senders SET sent_count = sent_count + 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Convert a database row to a Sender.
fn row_to_sender(row: &SqliteRow) -> Result<Sender> {
    Ok(Sender {
        id: SenderId(row.get("id")),
        display_name: row.get("display_name"),
        name: row.get("name"),
        email: row.get("email"),
        api_key: row.get("api_key"),
        esp: row.get("esp"),
        priority: row.get("priority"),
        target: row.get("target"),
        sent_count: row.get("sent_count"),
        is_deleted: row.get::<i64, _>("is_deleted") != 0,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::test_support::{new_sender, seed_sender, vault};

    #[tokio::test]
    async fn test_create_and_retrieve_sender() {
        let db = Database::in_memory().await.unwrap();
        let created = seed_sender(&db).await;

        let retrieved = db.senders().get(&created.id).await.unwrap().unwrap();
        assert_eq!(retrieved.email, "team@example.com");
        assert_eq!(retrieved.esp, "sendgrid");
        assert_eq!(retrieved.sent_count, 0);
        assert!(!retrieved.is_deleted);
    }

    #[tokio::test]
    async fn test_api_key_is_encrypted_at_rest() {
        let db = Database::in_memory().await.unwrap();
        let created = seed_sender(&db).await;

        let stored: String = sqlx::query_scalar("SELECT api_key FROM senders WHERE id = ?")
            .bind(&created.id.0)
            .fetch_one(&db.senders().pool)
            .await
            .unwrap();

        assert_ne!(stored, "SG.test-key");
        assert_eq!(vault().decrypt(&stored).unwrap(), "SG.test-key");
    }

    #[tokio::test]
    async fn test_soft_deleted_sender_is_hidden() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.senders();
        let created = repo.create(&new_sender("sendgrid"), vault()).await.unwrap();

        assert!(repo.soft_delete(&created.id).await.unwrap());
        assert!(repo.get(&created.id).await.unwrap().is_none());
        assert!(!repo.soft_delete(&created.id).await.unwrap());
        assert!(matches!(
            repo.require(&created.id).await,
            Err(Error::SenderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_increment_sent_count() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.senders();
        let created = seed_sender(&db).await;

        assert!(repo.increment_sent_count(&created.id).await.unwrap());
        assert!(repo.increment_sent_count(&created.id).await.unwrap());

        let retrieved = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(retrieved.sent_count, 2);
    }

    #[tokio::test]
    async fn test_increment_unknown_sender() {
        let db = Database::in_memory().await.unwrap();
        let updated = db
            .senders()
            .increment_sent_count(&SenderId::new("missing"))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let db = Database::in_memory().await.unwrap();
        let created = seed_sender(&db).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let repo = db.senders();
            let id = created.id.clone();
            handles.push(tokio::spawn(async move {
                repo.increment_sent_count(&id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let retrieved = db.senders().get(&created.id).await.unwrap().unwrap();
        assert_eq!(retrieved.sent_count, 20);
    }
}
