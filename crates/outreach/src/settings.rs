//! Service configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file
//! (`OUTREACH_CONFIG`, default `config/outreach.toml`), then environment
//! variables such as `OUTREACH__VAULT__SECRET`.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, bail};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use outreach_core::webhook::{DEFAULT_CONCURRENCY, SENDGRID_PLATFORM, SENDGRID_USER_AGENT};
use outreach_esp::sendgrid::DEFAULT_BASE_URL;
use serde::Deserialize;

const CONFIG_PATH_VAR: &str = "OUTREACH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/outreach.toml";
const ENV_PREFIX: &str = "OUTREACH";

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// SQLite database.
    pub database: DatabaseSettings,
    /// Credential vault.
    pub vault: VaultSettings,
    /// Provider webhook.
    pub webhook: WebhookSettings,
    /// SendGrid backend.
    pub sendgrid: SendGridSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    pub address: String,
    /// Bind port.
    pub port: u16,
}

impl ServerSettings {
    /// Parsed socket address.
    ///
    /// # Errors
    ///
    /// Returns an error if address and port don't form a socket address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.address, self.port)
            .parse()
            .with_context(|| format!("invalid server address {}:{}", self.address, self.port))
    }
}

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the SQLite file.
    pub path: String,
}

/// Credential vault settings.
#[derive(Clone, Deserialize)]
pub struct VaultSettings {
    /// Secret the vault key is derived from.
    pub secret: String,
}

impl fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSettings")
            .field("secret", &"***")
            .finish()
    }
}

/// Webhook settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    /// Platform name recorded in the audit log.
    pub platform: String,
    /// Exact user agent the provider posts with.
    pub user_agent: String,
    /// Groups reconciled in parallel per batch.
    pub concurrency: usize,
}

/// SendGrid backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SendGridSettings {
    /// API base URL.
    pub base_url: String,
}

impl Settings {
    /// Load settings from the default file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source can't be read, a value has the wrong
    /// type, or the vault secret is missing.
    pub fn load() -> anyhow::Result<Self> {
        let config_file =
            env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut builder = defaults()?;
        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::from(Path::new(&config_file)));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let settings: Self = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        if settings.vault.secret.trim().is_empty() {
            bail!("vault.secret must be set (e.g. OUTREACH__VAULT__SECRET)");
        }
        Ok(settings)
    }
}

fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("server.address", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("database.path", "outreach.db")?
        .set_default("vault.secret", "")?
        .set_default("webhook.platform", SENDGRID_PLATFORM)?
        .set_default("webhook.user_agent", SENDGRID_USER_AGENT)?
        .set_default("webhook.concurrency", DEFAULT_CONCURRENCY as u64)?
        .set_default("sendgrid.base_url", DEFAULT_BASE_URL)?)
}
