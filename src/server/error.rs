//! Error envelope for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ErrorKind;

#[derive(Debug)]
pub enum ApiError {
    /// The upload carried no `file` part.
    MissingFile,
    /// Malformed request body or unsupported upload.
    BadRequest(String),
    /// The multipart body could not be read; carries axum's status (e.g. 413).
    Upload { status: StatusCode, message: String },
    /// A failed pipeline invocation.
    Pipeline { kind: ErrorKind, message: String },
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload { status, .. } => *status,
            ApiError::Pipeline { kind, .. } if kind.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match self {
            ApiError::MissingFile => ("No file provided".to_string(), None),
            ApiError::BadRequest(msg) | ApiError::Upload { message: msg, .. } => (msg, None),
            ApiError::Pipeline { message, .. } => {
                ("Failed to process image".to_string(), Some(message))
            }
        };

        let body = ErrorEnvelope {
            success: false,
            error,
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        let status = e.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "File exceeds the upload size limit".to_string()
        } else {
            format!("Invalid upload: {}", e.body_text())
        };
        ApiError::Upload { status, message }
    }
}
