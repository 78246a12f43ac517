//! Google Gemini adapter for the [`VisionModel`] seam.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::analysis::{AnalysisPrompt, EncodedImage, RawModelResponse, VisionModel};
use crate::error::PipelineError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Upper bound on how much of an upstream body ends up in an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Client for the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// A missing or blank key is accepted here and reported on each call.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str, PipelineError> {
        self.api_key.as_deref().ok_or_else(|| {
            PipelineError::Configuration("GEMINI_API_KEY is not set".to_string())
        })
    }

    /// List models visible to the configured key.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, PipelineError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models", self.base_url);

        let response = self
            .http
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        let listing: ModelList = serde_json::from_str(&body)
            .map_err(|e| PipelineError::UpstreamEmptyResponse(e.to_string()))?;

        Ok(listing
            .models
            .into_iter()
            .map(|m| ModelInfo {
                supports_generate_content: m
                    .supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent"),
                name: m.name.trim_start_matches("models/").to_string(),
                display_name: m.display_name,
                description: m.description,
            })
            .collect())
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn analyze(
        &self,
        image: &EncodedImage,
        prompt: &AnalysisPrompt,
    ) -> Result<RawModelResponse, PipelineError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let payload = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": prompt.text() },
                    {
                        "inline_data": {
                            "mime_type": image.media_type,
                            "data": image.data
                        }
                    }
                ]
            }]
        });

        debug!(model = %self.model, bytes = image.data.len(), "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!(%status, len = body.len(), "generateContent responded");

        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        candidate_text(&body).map(RawModelResponse)
    }
}

/// A model entry from the listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub supports_generate_content: bool,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(body: &str) -> Result<String, PipelineError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::UpstreamEmptyResponse(format!("invalid JSON: {}", e)))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(PipelineError::UpstreamEmptyResponse(
            "no text in first candidate".to_string(),
        ));
    }
    Ok(text)
}

fn transport_error(e: reqwest::Error) -> PipelineError {
    PipelineError::UpstreamUnavailable(e.to_string())
}

fn rejection(status: reqwest::StatusCode, body: &str) -> PipelineError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| truncate(body.trim(), ERROR_BODY_LIMIT).to_string());
    PipelineError::UpstreamRejected(format!("{}: {}", status, message))
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
