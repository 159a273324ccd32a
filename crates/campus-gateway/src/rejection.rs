//! HTTP rendering of guard denials.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use campus_core::ErrorCode;
use campus_guards::BranchViolation;
use serde_json::json;

/// A guard denial ready to be sent to the client.
///
/// The body follows the API's existing error envelope
/// (`statusCode`, `error`, `message`) plus a stable `code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRejection(pub BranchViolation);

impl GuardRejection {
    /// HTTP status for the wrapped violation.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::FORBIDDEN)
    }
}

impl From<BranchViolation> for GuardRejection {
    fn from(violation: BranchViolation) -> Self {
        Self(violation)
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "statusCode": status.as_u16(),
            "error": self.0.status_text(),
            "message": self.0.to_string(),
            "code": self.0.code(),
        });
        (status, Json(body)).into_response()
    }
}
