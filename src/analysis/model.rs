use async_trait::async_trait;

use super::types::{AnalysisPrompt, EncodedImage, RawModelResponse};
use crate::error::PipelineError;

/// A multimodal model that can describe an encoded image.
///
/// Implementations make exactly one upstream attempt per call and never retry.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Model identifier, used for logging.
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        image: &EncodedImage,
        prompt: &AnalysisPrompt,
    ) -> Result<RawModelResponse, PipelineError>;
}
