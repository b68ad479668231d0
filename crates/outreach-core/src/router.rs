//! ESP Router: dispatches sends to the sender's provider backend.
//!
//! The router validates the sender's provider before any network or
//! decryption work, decrypts the sender's API key for the duration of the
//! call only, and hands off to the registered backend. It holds no per-call
//! state, so concurrent sends for different senders never share a credential.

use std::collections::HashMap;
use std::sync::Arc;

use outreach_esp::{ApiKey, EspBackend, FollowUpEmail, OutgoingEmail, Provider};
use thiserror::Error;
use tracing::debug;

use crate::sender::Sender;
use crate::vault::{CredentialVault, VaultError};

/// Errors from routing a send.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The sender's ESP is unknown or has no backend.
    #[error("Unsupported email service provider: {0}")]
    UnsupportedEsp(String),

    /// The sender's API key could not be decrypted.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Result type for routing.
pub type RouterResult<T> = std::result::Result<T, RouterError>;

/// Maps provider identifiers to backends.
#[derive(Clone)]
pub struct EspRouter {
    vault: Arc<CredentialVault>,
    backends: HashMap<Provider, Arc<dyn EspBackend>>,
}

impl EspRouter {
    /// Create a router with no backends registered.
    #[must_use]
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self {
            vault,
            backends: HashMap::new(),
        }
    }

    /// Register a backend under the provider it reports.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn EspBackend>) -> Self {
        self.backends.insert(backend.provider(), backend);
        self
    }

    /// Whether sends for this ESP identifier can be routed.
    #[must_use]
    pub fn supports(&self, esp: &str) -> bool {
        esp.parse::<Provider>()
            .is_ok_and(|provider| self.backends.contains_key(&provider))
    }

    /// Send first-touch emails from `sender` through its provider.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnsupportedEsp`] before any I/O if the sender's
    /// ESP has no backend, or [`RouterError::Vault`] if its key can't be
    /// decrypted. Provider failures are not reported.
    pub async fn send_emails(&self, sender: &Sender, items: &[OutgoingEmail]) -> RouterResult<()> {
        let (backend, api_key) = self.resolve(sender)?;
        debug!(
            "Routing {} email(s) from sender {} via {}",
            items.len(),
            sender.id,
            backend.provider()
        );
        backend.send_bulk(&api_key, &sender.profile(), items).await;
        Ok(())
    }

    /// Send one follow-up from `sender` through its provider.
    ///
    /// # Errors
    ///
    /// Same as [`send_emails`](Self::send_emails).
    pub async fn send_follow_up_email(
        &self,
        sender: &Sender,
        item: &FollowUpEmail,
    ) -> RouterResult<()> {
        let (backend, api_key) = self.resolve(sender)?;
        debug!(
            "Routing follow-up {} from sender {} via {}",
            item.correlation_id,
            sender.id,
            backend.provider()
        );
        backend
            .send_follow_up(&api_key, &sender.profile(), item)
            .await;
        Ok(())
    }

    fn resolve(&self, sender: &Sender) -> RouterResult<(&Arc<dyn EspBackend>, ApiKey)> {
        let backend = sender
            .esp
            .parse::<Provider>()
            .ok()
            .and_then(|provider| self.backends.get(&provider))
            .ok_or_else(|| RouterError::UnsupportedEsp(sender.esp.clone()))?;

        let api_key = ApiKey::new(self.vault.decrypt(&sender.api_key)?);
        Ok((backend, api_key))
    }
}

impl std::fmt::Debug for EspRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EspRouter")
            .field("providers", &self.backends.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use outreach_esp::SenderProfile;

    use super::*;
    use crate::sender::SenderId;
    use crate::test_support::{other_vault, vault, VAULT_SECRET};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Bulk {
            key: String,
            from: String,
            refs: Vec<String>,
        },
        FollowUp {
            key: String,
            from: String,
            in_reply_to: String,
        },
    }

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingBackend {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EspBackend for RecordingBackend {
        fn provider(&self) -> Provider {
            Provider::SendGrid
        }

        async fn send_bulk(&self, api_key: &ApiKey, from: &SenderProfile, messages: &[OutgoingEmail]) {
            self.calls.lock().unwrap().push(Call::Bulk {
                key: api_key.expose().to_string(),
                from: from.id.clone(),
                refs: messages.iter().map(|m| m.correlation_id.clone()).collect(),
            });
        }

        async fn send_follow_up(&self, api_key: &ApiKey, from: &SenderProfile, message: &FollowUpEmail) {
            self.calls.lock().unwrap().push(Call::FollowUp {
                key: api_key.expose().to_string(),
                from: from.id.clone(),
                in_reply_to: message.in_reply_to.clone(),
            });
        }
    }

    fn sender(esp: &str, encrypted_key: String) -> Sender {
        let now = Utc::now();
        Sender {
            id: SenderId::new("s1"),
            display_name: "Team".into(),
            name: "Team".into(),
            email: "team@example.com".into(),
            api_key: encrypted_key,
            esp: esp.into(),
            priority: 0,
            target: 0,
            sent_count: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn router() -> (EspRouter, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        let vault = Arc::new(CredentialVault::new(VAULT_SECRET).unwrap());
        let router = EspRouter::new(vault).with_backend(backend.clone());
        (router, backend)
    }

    fn email(reference: &str) -> OutgoingEmail {
        OutgoingEmail::new("lead@example.org", "Hi", "<p>Hi</p>", reference)
    }

    #[tokio::test]
    async fn test_send_emails_passes_decrypted_key() {
        let (router, backend) = router();
        let sender = sender("sendgrid", vault().encrypt("SG.live-key").unwrap());

        router
            .send_emails(&sender, &[email("e1"), email("e2")])
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![Call::Bulk {
                key: "SG.live-key".into(),
                from: "s1".into(),
                refs: vec!["e1".into(), "e2".into()],
            }]
        );
    }

    #[tokio::test]
    async fn test_send_follow_up_threads_onto_original() {
        let (router, backend) = router();
        let sender = sender("SendGrid", vault().encrypt("SG.live-key").unwrap());
        let follow_up = FollowUpEmail::new(email("f1"), "<orig@sendgrid.net>");

        router.send_follow_up_email(&sender, &follow_up).await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![Call::FollowUp {
                key: "SG.live-key".into(),
                from: "s1".into(),
                in_reply_to: "<orig@sendgrid.net>".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_esp_fails_before_decrypting() {
        let (router, backend) = router();
        // Not a valid ciphertext: a decrypt attempt would surface as a vault error
        let sender = sender("carrier-pigeon", "not-encrypted".into());

        let err = router.send_emails(&sender, &[email("e1")]).await.unwrap_err();

        assert!(matches!(err, RouterError::UnsupportedEsp(ref esp) if esp == "carrier-pigeon"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_known_esp_without_backend_is_unsupported() {
        let (router, backend) = router();
        let sender = sender("mailgun", vault().encrypt("key").unwrap());

        let follow_up = FollowUpEmail::new(email("f1"), "<orig@sendgrid.net>");
        let err = router
            .send_follow_up_email(&sender, &follow_up)
            .await
            .unwrap_err();

        assert!(matches!(err, RouterError::UnsupportedEsp(_)));
        assert!(backend.calls().is_empty());
        assert!(router.supports("sendgrid"));
        assert!(!router.supports("mailgun"));
    }

    #[tokio::test]
    async fn test_undecryptable_key_is_a_vault_error() {
        let (router, backend) = router();
        let sender = sender("sendgrid", other_vault().encrypt("SG.other").unwrap());

        let err = router.send_emails(&sender, &[email("e1")]).await.unwrap_err();

        assert!(matches!(err, RouterError::Vault(VaultError::Decryption(_))));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn debug_lists_providers_only() {
        let (router, _) = router();
        let debug = format!("{router:?}");
        assert!(debug.contains("SendGrid"));
        assert!(!debug.contains("cipher"));
    }
}
