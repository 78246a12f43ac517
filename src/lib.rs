//! Image description and tagging service backed by Google Gemini.

pub mod analysis;
pub mod config;
pub mod error;
pub mod gemini;
pub mod server;
pub mod storage;

pub use analysis::{AnalysisResult, ImagePayload, Pipeline, PipelineOutcome};
pub use error::{ErrorKind, PipelineError};
