//! HTTP error response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pmcdep_core::DepositError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
}

/// Wrapper mapping [`DepositError`] onto the queue contract: 422 tells
/// the queue the message is permanently bad, 400 asks for a retry.
pub struct ApiError(pub DepositError);

impl From<DepositError> for ApiError {
    fn from(err: DepositError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_unprocessable() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    fn errors(&self) -> Vec<String> {
        match &self.0 {
            DepositError::Validation(validation) => {
                validation.errors.iter().map(|e| e.describe()).collect()
            }
            DepositError::MissingFiles(paths) => {
                paths.iter().map(|p| format!("Missing file: {p}")).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            errors: self.errors(),
        };
        (status, Json(body)).into_response()
    }
}

/// A request the queue must not redeliver, e.g. a malformed envelope.
pub fn unprocessable(message: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            errors: vec![message.into()],
        }),
    )
        .into_response()
}
