//! # outreach-esp
//!
//! Email service provider (ESP) backends for outbound outreach mail.
//!
//! ## Features
//!
//! - **Uniform send model**: [`OutgoingEmail`] and [`FollowUpEmail`] describe a
//!   message independently of the provider that delivers it
//! - **Correlation metadata**: every message carries `{type, senderId, referenceId}`
//!   custom arguments that the provider echoes back in its event webhooks
//! - **Pluggable backends**: [`EspBackend`] is implemented once per provider
//! - **SendGrid**: v3 `mail/send` backend with reply threading headers
//!
//! ## Quick Start
//!
//! ```ignore
//! use outreach_esp::{ApiKey, EspBackend, OutgoingEmail, SendGridBackend, SenderProfile};
//!
//! let backend = SendGridBackend::new();
//! let from = SenderProfile::new("sender-1", "hello@example.com", "Hello Team");
//! let key = ApiKey::new("SG.xxxxx");
//!
//! backend
//!     .send_bulk(&key, &from, &[OutgoingEmail::new("lead@example.org", "Hi", "<p>Hi</p>", "email-1")])
//!     .await;
//! ```
//!
//! Sends are fire-and-forget: transport failures are logged by the backend and
//! never reach the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod backend;
mod error;
mod provider;
pub mod sendgrid;
mod types;

pub use backend::EspBackend;
pub use error::{Error, Result};
pub use provider::{Provider, UnknownProvider};
pub use sendgrid::SendGridBackend;
pub use types::{ApiKey, CustomArgs, FollowUpEmail, MessageKind, OutgoingEmail, SenderProfile};
