use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_insight::config::{Cli, Command, Settings};
use image_insight::server::{self, resolve_media_type, AppState};
use image_insight::ImagePayload;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_insight=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli.settings).await,
        Command::Analyze { path, media_type } => analyze(&cli.settings, &path, media_type).await,
        Command::Models => models(&cli.settings).await,
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    if settings.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; every analysis will fail until it is configured");
    }

    let mut state = AppState::new(settings.pipeline()).with_upload_limit(settings.max_upload_bytes);
    match settings.store() {
        Some(store) => {
            info!(bucket = %settings.storage_bucket, "storing uploads in Supabase");
            state = state.with_store(
                Arc::new(store),
                &settings.storage_bucket,
                &settings.storage_prefix,
            );
        }
        None => info!("Supabase is not configured; uploads will not be stored"),
    }

    info!(
        model = %settings.model,
        encoder = ?settings.encoder,
        deadline = ?state.pipeline.deadline(),
        max_upload_bytes = state.max_upload_bytes,
        "starting server"
    );
    let app = server::router(Arc::new(state));
    server::serve(settings.bind, app)
        .await
        .context("server terminated")
}

async fn analyze(settings: &Settings, path: &Path, media_type: Option<String>) -> Result<()> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let media_type = match media_type {
        Some(media_type) => media_type,
        None => resolve_media_type(None, &content)
            .with_context(|| format!("{} does not look like an image", path.display()))?,
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let outcome = settings
        .pipeline()
        .process(ImagePayload::new(content, media_type, filename))
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        anyhow::bail!("analysis failed");
    }
    Ok(())
}

async fn models(settings: &Settings) -> Result<()> {
    let models = settings
        .gemini_client()
        .list_models()
        .await
        .context("failed to list models")?;

    for model in models {
        println!(
            "{:<40} {:<5} {}",
            model.name,
            if model.supports_generate_content { "yes" } else { "no" },
            model.description.as_deref().unwrap_or("No description available"),
        );
    }
    Ok(())
}
