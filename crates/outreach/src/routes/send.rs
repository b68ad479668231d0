//! Outbound send endpoints.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use outreach_core::SenderId;
use outreach_esp::{FollowUpEmail, OutgoingEmail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResponse};
use crate::state::AppState;

/// One email of a bulk send.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailItem {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
    /// Correlation id of the stored email.
    pub reference_id: String,
}

impl From<EmailItem> for OutgoingEmail {
    fn from(item: EmailItem) -> Self {
        Self::new(item.to, item.subject, item.body, item.reference_id)
    }
}

/// `POST /api/emails/send` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailsRequest {
    /// Sender to send from.
    pub sender_id: String,
    /// Emails to send.
    pub emails: Vec<EmailItem>,
}

/// `POST /api/follow-ups/send` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFollowUpRequest {
    /// Sender to send from.
    pub sender_id: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
    /// Correlation id of the stored follow-up.
    pub reference_id: String,
    /// Provider message id of the original email.
    pub in_reply_to: String,
}

/// Acknowledgement payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatched {
    /// Sender the messages went out from.
    pub sender_id: String,
    /// Provider used.
    pub esp: String,
    /// Number of messages handed to the provider.
    pub count: usize,
}

type Accepted = (StatusCode, Json<ApiResponse<Dispatched>>);

/// `POST /api/emails/send`
pub async fn send_emails(
    State(state): State<AppState>,
    payload: Result<Json<SendEmailsRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let Json(request) = payload?;
    if request.emails.is_empty() {
        return Err(ApiError::BadRequest("emails must not be empty".into()));
    }

    let sender = state
        .db
        .senders()
        .require(&SenderId::new(request.sender_id))
        .await?;
    let items: Vec<OutgoingEmail> = request.emails.into_iter().map(Into::into).collect();

    state.router.send_emails(&sender, &items).await?;

    info!("Dispatched {} email(s) from sender {}", items.len(), sender.id);
    Ok(ApiResponse::ok(
        StatusCode::ACCEPTED,
        "Emails dispatched",
        Dispatched {
            sender_id: sender.id.to_string(),
            esp: sender.esp,
            count: items.len(),
        },
    ))
}

/// `POST /api/follow-ups/send`
pub async fn send_follow_up(
    State(state): State<AppState>,
    payload: Result<Json<SendFollowUpRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let Json(request) = payload?;
    if request.in_reply_to.trim().is_empty() {
        return Err(ApiError::BadRequest("inReplyTo must not be empty".into()));
    }

    let sender = state
        .db
        .senders()
        .require(&SenderId::new(request.sender_id))
        .await?;
    let follow_up = FollowUpEmail::new(
        OutgoingEmail::new(request.to, request.subject, request.body, request.reference_id),
        request.in_reply_to,
    );

    state.router.send_follow_up_email(&sender, &follow_up).await?;

    info!(
        "Dispatched follow-up {} from sender {}",
        follow_up.correlation_id, sender.id
    );
    Ok(ApiResponse::ok(
        StatusCode::ACCEPTED,
        "Follow-up dispatched",
        Dispatched {
            sender_id: sender.id.to_string(),
            esp: sender.esp,
            count: 1,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routes::test_support;

    fn emails_request(sender_id: &str) -> SendEmailsRequest {
        SendEmailsRequest {
            sender_id: sender_id.to_string(),
            emails: vec![EmailItem {
                to: "lead@example.org".into(),
                subject: "Hi".into(),
                body: "<p>Hi</p>".into(),
                reference_id: "e1".into(),
            }],
        }
    }

    fn follow_up_request(sender_id: &str) -> SendFollowUpRequest {
        SendFollowUpRequest {
            sender_id: sender_id.to_string(),
            to: "lead@example.org".into(),
            subject: "Re: Hi".into(),
            body: "<p>Bump</p>".into(),
            reference_id: "f1".into(),
            in_reply_to: "<orig@sendgrid.net>".into(),
        }
    }

    #[tokio::test]
    async fn provider_failure_still_acknowledges() {
        let state = test_support::state().await;
        let sender = test_support::sender(&state, "sendgrid").await;

        let (status, Json(body)) =
            send_emails(State(state), Ok(Json(emails_request(sender.id.as_str()))))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            body.result.unwrap(),
            Dispatched {
                sender_id: sender.id.to_string(),
                esp: "sendgrid".into(),
                count: 1,
            }
        );
    }

    #[tokio::test]
    async fn unknown_sender_is_not_found() {
        let state = test_support::state().await;
        let err = send_emails(State(state), Ok(Json(emails_request("missing"))))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unsupported_esp_is_conflict() {
        let state = test_support::state().await;
        let sender = test_support::sender(&state, "postmark").await;

        let err = send_follow_up(
            State(state),
            Ok(Json(follow_up_request(sender.id.as_str()))),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn empty_batch_is_bad_request() {
        let state = test_support::state().await;
        let mut request = emails_request("s1");
        request.emails.clear();

        let err = send_emails(State(state), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn follow_up_is_dispatched() {
        let state = test_support::state().await;
        let sender = test_support::sender(&state, "sendgrid").await;

        let (status, Json(body)) = send_follow_up(
            State(state),
            Ok(Json(follow_up_request(sender.id.as_str()))),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body.result.unwrap().count, 1);
    }

    #[test]
    fn request_uses_camel_case() {
        let request: SendFollowUpRequest = serde_json::from_value(serde_json::json!({
            "senderId": "s1",
            "to": "lead@example.org",
            "subject": "Re: Hi",
            "body": "<p>Bump</p>",
            "referenceId": "f1",
            "inReplyTo": "<orig@sendgrid.net>",
        }))
        .unwrap();
        assert_eq!(request.reference_id, "f1");
        assert_eq!(request.in_reply_to, "<orig@sendgrid.net>");
    }
}
