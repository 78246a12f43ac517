//! Base64 encoding of uploaded images.
//!
//! Two interchangeable encoders exist: a one-shot buffer encoder and a
//! chunked writer-based one. Both produce identical text.

use std::io::Write;

use base64::write::EncoderStringWriter;
use base64::{engine::general_purpose, Engine as _};
use clap::ValueEnum;

use super::types::{EncodedImage, ImagePayload};
use crate::error::PipelineError;

/// Bytes fed to the stream encoder per write. A multiple of 3 keeps
/// padding out of intermediate chunks.
const STREAM_CHUNK: usize = 3 * 1024;

/// Converts an image payload into transport-safe text.
pub trait Encoder: Send + Sync {
    fn encode(&self, payload: ImagePayload) -> Result<EncodedImage, PipelineError>;
}

/// Which [`Encoder`] implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EncoderKind {
    #[default]
    Buffer,
    Stream,
}

impl EncoderKind {
    pub fn build(self) -> Box<dyn Encoder> {
        match self {
            EncoderKind::Buffer => Box::new(BufferEncoder),
            EncoderKind::Stream => Box::new(StreamEncoder),
        }
    }
}

/// Encodes the whole buffer in one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferEncoder;

impl Encoder for BufferEncoder {
    fn encode(&self, payload: ImagePayload) -> Result<EncodedImage, PipelineError> {
        ensure_not_empty(&payload)?;
        Ok(EncodedImage {
            data: general_purpose::STANDARD.encode(&payload.content),
            media_type: payload.media_type,
        })
    }
}

/// Encodes through a base64 writer, chunk by chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamEncoder;

impl Encoder for StreamEncoder {
    fn encode(&self, payload: ImagePayload) -> Result<EncodedImage, PipelineError> {
        ensure_not_empty(&payload)?;

        let mut writer = EncoderStringWriter::new(&general_purpose::STANDARD);
        for chunk in payload.content.chunks(STREAM_CHUNK) {
            writer
                .write_all(chunk)
                .map_err(|e| PipelineError::Encoding(e.to_string()))?;
        }

        Ok(EncodedImage {
            data: writer.into_inner(),
            media_type: payload.media_type,
        })
    }
}

fn ensure_not_empty(payload: &ImagePayload) -> Result<(), PipelineError> {
    if payload.content.is_empty() {
        return Err(PipelineError::Encoding(format!(
            "'{}' is empty",
            payload.filename
        )));
    }
    Ok(())
}
