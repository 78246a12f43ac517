//! Values flowing through one pipeline invocation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Description used whenever the model gives us nothing usable.
pub const PLACEHOLDER_DESCRIPTION: &str = "No description available";

/// Confidence reported when the model omits or garbles its score.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// An uploaded image as received at the boundary.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub content: Bytes,
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    /// Original filename; informational only.
    pub filename: String,
}

impl ImagePayload {
    pub fn new(
        content: impl Into<Bytes>,
        media_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            media_type: media_type.into(),
            filename: filename.into(),
        }
    }
}

/// Base64 text of an image plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: String,
}

impl EncodedImage {
    /// Render as a `data:` URL suitable for an `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Instruction text sent alongside every image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisPrompt(pub(crate) &'static str);

impl AnalysisPrompt {
    pub fn text(&self) -> &'static str {
        self.0
    }
}

/// Unstructured text returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelResponse(pub String);

impl RawModelResponse {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Canonical analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "analysis")]
    pub description: String,
    pub tags: Vec<String>,
    /// Always within `[0, 1]`.
    pub confidence: f64,
}

impl AnalysisResult {
    /// Result built from unparseable model output.
    pub fn degraded(text: &str) -> Self {
        let text = text.trim();
        Self {
            description: if text.is_empty() {
                PLACEHOLDER_DESCRIPTION.to_string()
            } else {
                text.to_string()
            },
            tags: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Result of one pipeline invocation: never both a result and an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Success(AnalysisResult),
    Failure { kind: ErrorKind, message: String },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success(_))
    }
}
