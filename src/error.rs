//! Failure taxonomy for a pipeline invocation.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failed invocation, surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    UpstreamUnavailable,
    UpstreamTimeout,
    UpstreamRejected,
    UpstreamEmptyResponse,
    Encoding,
}

impl ErrorKind {
    /// Whether the failure was caused by the uploaded payload rather than the server.
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorKind::Encoding)
    }
}

/// Errors raised by the encoder and the upstream adapter.
///
/// The normalizer has no error type: it always yields a result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream did not answer within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("upstream rejected the request: {0}")]
    UpstreamRejected(String),

    #[error("upstream returned an empty or malformed response: {0}")]
    UpstreamEmptyResponse(String),

    #[error("could not encode image: {0}")]
    Encoding(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            PipelineError::UpstreamTimeout(_) => ErrorKind::UpstreamTimeout,
            PipelineError::UpstreamRejected(_) => ErrorKind::UpstreamRejected,
            PipelineError::UpstreamEmptyResponse(_) => ErrorKind::UpstreamEmptyResponse,
            PipelineError::Encoding(_) => ErrorKind::Encoding,
        }
    }
}
