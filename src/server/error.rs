//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; the common error converts
//! with `?` and its message is passed through to the client verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use playout_common::Error;
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<playout_av::Error> for AppError {
    fn from(e: playout_av::Error) -> Self {
        Self(e.into())
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match &self.0 {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::ScheduleConflict { .. } => "schedule_conflict",
            Error::Conflict(_) => "conflict",
            Error::NotImplemented(_) => "not_implemented",
            Error::Database(_) => "database_error",
            Error::Dependency { .. } => "dependency_error",
            Error::Io(_) => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in API handler"
            );
        }

        let mut body = json!({
            "error": self.0.to_string(),
            "code": self.code(),
        });
        if let Error::ScheduleConflict { entry_id } = &self.0 {
            body["entry_id"] = json!(entry_id);
        }

        (status, axum::Json(body)).into_response()
    }
}
