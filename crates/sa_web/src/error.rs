use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal error occurred. See logs for full stacktrace.";

/// Every failure surfaces as the same 500; details only reach the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] sa_core::Error),

    #[error("Invalid form body: {0}")]
    Form(#[from] FormRejection),

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartRejection),

    #[error("Invalid multipart field: {0}")]
    MultipartField(#[from] MultipartError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("An error occurred during a request: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE).into_response()
    }
}
