//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::analysis::{EncoderKind, Pipeline};
use crate::gemini::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::storage::SupabaseStore;

/// Default request body limit (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "image-insight", version, about = "Describe and tag uploaded images with Gemini")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server (default).
    Serve,
    /// Analyze a local image file and print the outcome as JSON.
    Analyze {
        path: PathBuf,
        /// Override the media type sniffed from the file contents.
        #[arg(long)]
        media_type: Option<String>,
    },
    /// List the models available to the configured API key.
    Models,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Gemini API key. Requests fail with a configuration error when unset.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub gemini_base_url: String,

    /// Upper bound on each upstream call, in seconds.
    #[arg(long, env = "ANALYSIS_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    #[arg(long, env = "IMAGE_ENCODER", value_enum, default_value_t = EncoderKind::Buffer, global = true)]
    pub encoder: EncoderKind,

    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true, global = true)]
    pub supabase_key: Option<String>,

    #[arg(long, env = "STORAGE_BUCKET", default_value = "images", global = true)]
    pub storage_bucket: String,

    /// Directory inside the bucket that uploads land in.
    #[arg(long, env = "STORAGE_PREFIX", default_value = "uploads", global = true)]
    pub storage_prefix: String,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000", global = true)]
    pub bind: SocketAddr,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES, global = true)]
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn gemini_client(&self) -> GeminiClient {
        GeminiClient::new(self.gemini_api_key.clone(), &self.model)
            .with_base_url(&self.gemini_base_url)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.encoder.build(), Arc::new(self.gemini_client()))
            .with_deadline(self.deadline())
    }

    /// `None` unless both Supabase credentials are set.
    pub fn store(&self) -> Option<SupabaseStore> {
        SupabaseStore::from_credentials(self.supabase_url.as_deref(), self.supabase_key.as_deref())
    }
}
