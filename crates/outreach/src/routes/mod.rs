//! HTTP routes.

mod send;
mod webhook;

use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use serde_json::{Value, json};

use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/webhooks/sendgrid", post(webhook::sendgrid))
        .route("/api/emails/send", post(send::send_emails))
        .route("/api/follow-ups/send", post(send::send_follow_up))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
