//! HTTP error mapping and the response envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use outreach_core::RouterError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Body of every API response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// HTTP status code, repeated in the body.
    pub status_code: u16,
    /// Human-readable summary.
    pub message: String,
    /// Payload, if any.
    pub result: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful response.
    pub fn ok(status: StatusCode, message: impl Into<String>, result: T) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                success: true,
                status_code: status.as_u16(),
                message: message.into(),
                result: Some(result),
            }),
        )
    }
}

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters are invalid.
    #[error("{0}")]
    BadRequest(String),

    /// Request did not come from a trusted origin.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with the resource's configuration.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected server-side failure. The detail is logged, not returned.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Status code for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<outreach_core::Error> for ApiError {
    fn from(err: outreach_core::Error) -> Self {
        match err {
            outreach_core::Error::SenderNotFound(id) => {
                Self::NotFound(format!("Sender not found: {id}"))
            }
            outreach_core::Error::InvalidMessage(msg) => Self::BadRequest(msg),
            outreach_core::Error::Routing(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::UnsupportedEsp(esp) => {
                Self::Conflict(format!("Unsupported email service provider: {esp}"))
            }
            RouterError::Vault(e) => Self::Internal(format!("Credential error: {e}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(detail) => {
                error!("Request failed: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()> {
            success: false,
            status_code: status.as_u16(),
            message,
            result: None,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use outreach_core::VaultError;

    use super::*;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (
                ApiError::from(outreach_core::Error::SenderNotFound("s1".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(RouterError::UnsupportedEsp("pigeon".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(outreach_core::Error::Routing(RouterError::UnsupportedEsp(
                    "pigeon".into(),
                ))),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(RouterError::Vault(VaultError::Decryption("bad".into()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(outreach_core::Error::CorruptRecord("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err:?}");
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let response = ApiError::Internal("database is locked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_uses_camel_case() {
        let (status, Json(body)) = ApiResponse::ok(StatusCode::ACCEPTED, "queued", 3);
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"success": true, "statusCode": 202, "message": "queued", "result": 3})
        );
    }
}
