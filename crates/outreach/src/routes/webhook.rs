//! Provider event webhook.

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use outreach_core::{BatchReport, IngestOutcome};

use crate::error::{ApiError, ApiResponse};
use crate::state::AppState;

/// `POST /api/webhooks/sendgrid`
pub async fn sendgrid(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<ApiResponse<BatchReport>>), ApiError> {
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());

    match state.ingestor.ingest(user_agent, &body).await? {
        IngestOutcome::Rejected => Err(ApiError::Forbidden("Untrusted webhook origin".into())),
        IngestOutcome::Malformed(reason) => Err(ApiError::BadRequest(format!(
            "Webhook body must be an array of events: {reason}"
        ))),
        IngestOutcome::Accepted(report) => Ok(ApiResponse::ok(
            StatusCode::OK,
            "Webhook processed",
            report,
        )),
    }
}
