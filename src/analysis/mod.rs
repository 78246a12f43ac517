//! Image-analysis pipeline: encoder, prompt, model seam, normalizer and orchestrator.

pub mod encoder;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod types;

pub use encoder::{BufferEncoder, Encoder, EncoderKind, StreamEncoder};
pub use model::VisionModel;
pub use normalize::normalize;
pub use pipeline::Pipeline;
pub use prompt::build_prompt;
pub use types::{
    AnalysisPrompt, AnalysisResult, EncodedImage, ImagePayload, PipelineOutcome,
    RawModelResponse,
};
