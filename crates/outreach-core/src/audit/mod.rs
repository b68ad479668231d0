//! Write-ahead archive of raw webhook bodies.

mod repository;

pub use repository::{AuditLogRepository, WebhookLog};
