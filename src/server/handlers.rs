use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    response::Html,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ApiError;
use super::page::INDEX_HTML;
use super::AppState;
use crate::analysis::{AnalysisResult, ImagePayload, PipelineOutcome};

/// Name of the multipart part carrying the image.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub id: String,
    pub image_url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub processed_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUrlRequest {
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(state.max_upload_bytes))
}

/// Fill the upload limit into the page, both as a hint and for the
/// client-side size check.
fn render_index(max_upload_bytes: usize) -> String {
    INDEX_HTML
        .replace("{{MAX_UPLOAD_LABEL}}", &format_size(max_upload_bytes))
        .replace("{{MAX_UPLOAD_BYTES}}", &max_upload_bytes.to_string())
}

fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;
    match bytes {
        b if b >= MIB && b % MIB == 0 => format!("{} MB", b / MIB),
        b if b >= MIB => format!("{:.1} MB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{} KB", b / KIB),
        b => format!("{} bytes", b),
    }
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /api/process-image`: analyze the uploaded `file` part.
pub async fn process_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Envelope<ProcessedImage>>, ApiError> {
    let payload = read_upload(&mut multipart)
        .await?
        .ok_or(ApiError::MissingFile)?;

    let (outcome, encoded) = state.pipeline.process_encoded(payload.clone()).await;
    let result = into_result(outcome)?;

    let (stored_id, stored_url) = persist(&state, &payload, &result).await;
    let image_url = stored_url
        .or_else(|| encoded.map(|encoded| encoded.data_url()))
        .unwrap_or_default();

    Ok(Json(Envelope {
        success: true,
        data: ProcessedImage {
            id: stored_id.unwrap_or_else(short_id),
            image_url,
            description: result.description,
            tags: result.tags,
            confidence: result.confidence,
            processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    }))
}

/// `POST /api/test-ai`: analyze an image given inline as a base64 data URL.
pub async fn analyze_data_url(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DataUrlRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let image_url = request
        .image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("imageUrl is required".to_string()))?;

    let (media_type, content) = parse_data_url(&image_url).ok_or_else(|| {
        ApiError::BadRequest("imageUrl must be a base64 image data URL".to_string())
    })?;

    let payload = ImagePayload::new(content, media_type, "inline");
    into_result(state.pipeline.process(payload).await).map(Json)
}

fn into_result(outcome: PipelineOutcome) -> Result<AnalysisResult, ApiError> {
    match outcome {
        PipelineOutcome::Success(result) => Ok(result),
        PipelineOutcome::Failure { kind, message } => Err(ApiError::Pipeline { kind, message }),
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<ImagePayload>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(str::to_string);
        let content = field.bytes().await?;

        let media_type = if content.is_empty() {
            // The encoder reports empty uploads.
            declared.unwrap_or_else(|| "application/octet-stream".to_string())
        } else {
            resolve_media_type(declared.as_deref(), &content).ok_or_else(|| {
                ApiError::BadRequest("Unsupported file type: expected an image".to_string())
            })?
        };

        debug!(%filename, %media_type, bytes = content.len(), "upload received");
        return Ok(Some(ImagePayload::new(content, media_type, filename)));
    }
    Ok(None)
}

/// Trust a declared `image/*` type, otherwise sniff the bytes.
pub fn resolve_media_type(declared: Option<&str>, content: &[u8]) -> Option<String> {
    if let Some(declared) = declared.filter(|t| t.starts_with("image/")) {
        return Some(declared.to_string());
    }
    let format = image::guess_format(content).ok()?;
    mime_for(format).map(str::to_string)
}

fn mime_for(format: image::ImageFormat) -> Option<&'static str> {
    use image::ImageFormat;

    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        ImageFormat::Ico => Some("image/x-icon"),
        ImageFormat::Avif => Some("image/avif"),
        _ => None,
    }
}

/// Split `data:<type>;base64,<data>` into its media type and bytes.
pub fn parse_data_url(url: &str) -> Option<(String, Bytes)> {
    let (header, data) = url.trim().strip_prefix("data:")?.split_once(',')?;
    let header = header.strip_suffix(";base64")?;
    let media_type = header.split(';').next().unwrap_or_default();
    if !media_type.starts_with("image/") {
        return None;
    }
    let content = general_purpose::STANDARD.decode(data).ok()?;
    Some((media_type.to_string(), Bytes::from(content)))
}

/// Store the upload and its analysis when a store is configured.
///
/// Returns the row id and public URL that succeeded; failures are logged.
async fn persist(
    state: &AppState,
    payload: &ImagePayload,
    result: &AnalysisResult,
) -> (Option<String>, Option<String>) {
    let Some(store) = state.store.as_ref() else {
        return (None, None);
    };

    let stored = match store
        .upload_image(&state.bucket, &state.prefix, payload)
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            warn!(file = %payload.filename, "failed to store upload: {}", e);
            return (None, None);
        }
    };

    match store.save_analysis(&stored.path, result, None).await {
        Ok(record) => (Some(record.id), Some(stored.public_url)),
        Err(e) => {
            warn!(path = %stored.path, "failed to save analysis: {}", e);
            (None, Some(stored.public_url))
        }
    }
}

fn short_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..7].to_string()
}
