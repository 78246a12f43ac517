//! Optional persistence of uploads and their analyses in Supabase.
//!
//! The store is only built when both the project URL and key are configured.
//! Callers treat every [`StorageError`] as non-fatal.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::analysis::{AnalysisResult, ImagePayload};

const ANALYSES_TABLE: &str = "image_analyses";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage rejected {operation} with {status}: {message}")]
    Rejected {
        operation: &'static str,
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("storage returned no rows")]
    NoRows,
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub path: String,
    pub public_url: String,
    pub file_name: String,
}

/// A persisted analysis row.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub created_at: String,
    pub image_path: String,
    pub analysis_data: serde_json::Value,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewAnalysis<'a> {
    image_path: &'a str,
    analysis_data: &'a AnalysisResult,
    user_id: Option<&'a str>,
}

/// Object store plus analysis table.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Upload under `dir/` with a fresh random name.
    async fn upload_image(
        &self,
        bucket: &str,
        dir: &str,
        payload: &ImagePayload,
    ) -> Result<StoredImage, StorageError>;

    /// Insert a new row; rows are never updated.
    async fn save_analysis(
        &self,
        image_path: &str,
        analysis: &AnalysisResult,
        user_id: Option<&str>,
    ) -> Result<AnalysisRecord, StorageError>;
}

/// Supabase storage + PostgREST backend.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    url: String,
    key: String,
}

impl SupabaseStore {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            key: key.into(),
        }
    }

    /// Build a store only if both credentials are present and non-blank.
    pub fn from_credentials(url: Option<&str>, key: Option<&str>) -> Option<Self> {
        match (url.map(str::trim), key.map(str::trim)) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
                Some(Self::new(url, key))
            }
            _ => None,
        }
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, bucket, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.key))
    }
}

#[async_trait]
impl AnalysisStore for SupabaseStore {
    async fn upload_image(
        &self,
        bucket: &str,
        dir: &str,
        payload: &ImagePayload,
    ) -> Result<StoredImage, StorageError> {
        let file_name = object_name(&payload.filename, &payload.media_type);
        let path = object_path(dir, &file_name);
        let url = format!("{}/storage/v1/object/{}/{}", self.url, bucket, path);

        let response = self
            .authorized(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, &payload.media_type)
            .header(reqwest::header::CACHE_CONTROL, "3600")
            .header("x-upsert", "false")
            .body(payload.content.clone())
            .send()
            .await?;

        check(response, "upload").await?;
        debug!(%bucket, %path, "image stored");

        Ok(StoredImage {
            public_url: self.public_url(bucket, &path),
            path,
            file_name,
        })
    }

    async fn save_analysis(
        &self,
        image_path: &str,
        analysis: &AnalysisResult,
        user_id: Option<&str>,
    ) -> Result<AnalysisRecord, StorageError> {
        let url = format!("{}/rest/v1/{}", self.url, ANALYSES_TABLE);
        let row = NewAnalysis {
            image_path,
            analysis_data: analysis,
            user_id,
        };

        let response = self
            .authorized(self.http.post(&url))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let rows: Vec<AnalysisRecord> = check(response, "insert").await?.json().await?;
        rows.into_iter().next().ok_or(StorageError::NoRows)
    }
}

async fn check(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Rejected {
        operation,
        status,
        message,
    })
}

/// Random object name keeping the upload's extension.
fn object_name(filename: &str, media_type: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}.{}", &id[..12], extension(filename, media_type))
}

fn extension(filename: &str, media_type: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| media_type.strip_prefix("image/"))
        .map(|ext| match ext {
            "jpeg" => "jpg",
            "svg+xml" => "svg",
            other => other,
        })
        .unwrap_or("bin")
        .to_ascii_lowercase()
}

fn object_path(dir: &str, file_name: &str) -> String {
    format!("{}/{}", dir.trim_matches('/'), file_name)
        .trim_start_matches('/')
        .to_string()
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}
