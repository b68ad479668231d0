//! Shared handler state.

use std::sync::Arc;

use anyhow::Context;
use outreach_core::{CredentialVault, Database, EspRouter, Reconciler, WebhookConfig, WebhookIngestor};
use outreach_esp::SendGridBackend;
use tracing::info;

use crate::settings::Settings;

/// State cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// Outbound send dispatch.
    pub router: EspRouter,
    /// Webhook pipeline.
    pub ingestor: WebhookIngestor,
}

impl AppState {
    /// Open the database and build the vault, router and ingestor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database can't be opened or the vault key
    /// can't be derived.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let db = Database::open(&settings.database.path)
            .await
            .with_context(|| format!("failed to open database {}", settings.database.path))?;

        let vault = Arc::new(
            CredentialVault::new(&settings.vault.secret).context("failed to initialize vault")?,
        );

        let sendgrid = SendGridBackend::new().with_base_url(&settings.sendgrid.base_url);
        let router = EspRouter::new(vault).with_backend(Arc::new(sendgrid));

        let webhook = WebhookConfig::new(&settings.webhook.platform, &settings.webhook.user_agent);
        let reconciler = Reconciler::new(&db).with_concurrency(settings.webhook.concurrency);
        let ingestor = WebhookIngestor::new(webhook, &db, reconciler);

        info!(
            "Ready: database {}, webhook concurrency {}",
            settings.database.path, settings.webhook.concurrency
        );
        Ok(Self {
            db,
            router,
            ingestor,
        })
    }
}
