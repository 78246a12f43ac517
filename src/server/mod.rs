//! HTTP surface: upload page, analysis endpoints and health check.

mod error;
mod handlers;
mod page;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::analysis::Pipeline;
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::storage::AnalysisStore;

pub use error::ApiError;
pub use handlers::{parse_data_url, resolve_media_type};

/// Shared, read-only state for every request.
pub struct AppState {
    pub pipeline: Pipeline,
    pub store: Option<Arc<dyn AnalysisStore>>,
    pub bucket: String,
    pub prefix: String,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            store: None,
            bucket: "images".to_string(),
            prefix: "uploads".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_store(
        mut self,
        store: Arc<dyn AnalysisStore>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        self.store = Some(store);
        self.bucket = bucket.into();
        self.prefix = prefix.into();
        self
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/process-image", post(handlers::process_image))
        .route("/api/test-ai", post(handlers::analyze_data_url))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
