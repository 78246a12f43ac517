//! Orchestrates encode → analyze → normalize for a single upload.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::encoder::Encoder;
use super::model::VisionModel;
use super::normalize::normalize;
use super::prompt::build_prompt;
use super::types::{AnalysisPrompt, AnalysisResult, EncodedImage, ImagePayload, PipelineOutcome};
use crate::error::PipelineError;

/// Default upper bound on the upstream call.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Sequential image-analysis pipeline.
///
/// Holds no mutable state, so one instance is shared across all requests.
pub struct Pipeline {
    encoder: Box<dyn Encoder>,
    model: Arc<dyn VisionModel>,
    prompt: AnalysisPrompt,
    deadline: Duration,
}

impl Pipeline {
    pub fn new(encoder: Box<dyn Encoder>, model: Arc<dyn VisionModel>) -> Self {
        Self {
            encoder,
            model,
            prompt: build_prompt(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run one invocation. Every failure is folded into the outcome.
    pub async fn process(&self, payload: ImagePayload) -> PipelineOutcome {
        self.process_encoded(payload).await.0
    }

    /// Like [`Pipeline::process`], also handing back the encoded image.
    ///
    /// The encoding is present whenever the outcome is a success.
    pub async fn process_encoded(
        &self,
        payload: ImagePayload,
    ) -> (PipelineOutcome, Option<EncodedImage>) {
        let started = Instant::now();
        let filename = payload.filename.clone();

        match self.run(payload).await {
            Ok((result, encoded)) => {
                info!(
                    file = %filename,
                    model = self.model.name(),
                    tags = result.tags.len(),
                    confidence = result.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "image analyzed"
                );
                (PipelineOutcome::Success(result), Some(encoded))
            }
            Err(e) => {
                warn!(file = %filename, kind = ?e.kind(), "image analysis failed: {}", e);
                let outcome = PipelineOutcome::Failure {
                    kind: e.kind(),
                    message: e.to_string(),
                };
                (outcome, None)
            }
        }
    }

    async fn run(
        &self,
        payload: ImagePayload,
    ) -> Result<(AnalysisResult, EncodedImage), PipelineError> {
        let bytes = payload.content.len();
        let encoded = self.encoder.encode(payload)?;
        debug!(bytes, media_type = %encoded.media_type, "image encoded");

        let raw = tokio::time::timeout(self.deadline, self.model.analyze(&encoded, &self.prompt))
            .await
            .map_err(|_| PipelineError::UpstreamTimeout(self.deadline))??;

        Ok((normalize(&raw), encoded))
    }
}
