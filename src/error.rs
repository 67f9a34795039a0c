//! Error handling and custom error types
//!
//! Provides unified error handling across the service using thiserror, plus
//! the JSON error body returned by the HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Image file format {0} not allowed")]
    UnsupportedImageFormat(String),

    #[error("Cast to {kind} failed for value \"{value}\" at path \"{path}\"")]
    Cast {
        kind: &'static str,
        path: String,
        value: String,
    },

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a route: a fixed message plus the underlying error.
///
/// Every variant maps to `500`; the error text is passed through verbatim.
#[derive(Debug)]
pub struct ApiError {
    message: &'static str,
    error: Error,
}

impl ApiError {
    pub fn new(message: &'static str, error: Error) -> Self {
        Self { message, error }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("{}: {}", self.message, self.error);

        let body = json!({
            "message": self.message,
            "error": self.error.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
