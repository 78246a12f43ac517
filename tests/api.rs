//! Router tests driven through `oneshot`, with the upstream model and store stubbed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use image_insight::analysis::{
    AnalysisPrompt, AnalysisResult, BufferEncoder, EncodedImage, Encoder, ImagePayload, Pipeline,
    RawModelResponse, VisionModel,
};
use image_insight::gemini::GeminiClient;
use image_insight::server::{router, AppState};
use image_insight::storage::{AnalysisRecord, AnalysisStore, StorageError, StoredImage};
use image_insight::PipelineError;

const BOUNDARY: &str = "insight-test-boundary";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

enum Reply {
    Text(&'static str),
    Unavailable,
}

struct StubModel {
    reply: Reply,
    seen_media: Mutex<Vec<String>>,
}

impl StubModel {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            seen_media: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl VisionModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn analyze(
        &self,
        image: &EncodedImage,
        _prompt: &AnalysisPrompt,
    ) -> Result<RawModelResponse, PipelineError> {
        self.seen_media.lock().unwrap().push(image.media_type.clone());
        match self.reply {
            Reply::Text(text) => Ok(RawModelResponse(text.to_string())),
            Reply::Unavailable => Err(PipelineError::UpstreamUnavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

#[derive(Default)]
struct MemoryStore {
    uploads: AtomicUsize,
    fail_uploads: bool,
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn upload_image(
        &self,
        bucket: &str,
        dir: &str,
        payload: &ImagePayload,
    ) -> Result<StoredImage, StorageError> {
        if self.fail_uploads {
            return Err(StorageError::NoRows);
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let path = format!("{}/{}", dir, payload.filename);
        Ok(StoredImage {
            public_url: format!("https://cdn.test/{}/{}", bucket, path),
            path,
            file_name: payload.filename.clone(),
        })
    }

    async fn save_analysis(
        &self,
        image_path: &str,
        analysis: &AnalysisResult,
        user_id: Option<&str>,
    ) -> Result<AnalysisRecord, StorageError> {
        Ok(AnalysisRecord {
            id: "row-1".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            image_path: image_path.to_string(),
            analysis_data: serde_json::to_value(analysis).unwrap(),
            user_id: user_id.map(str::to_string),
        })
    }
}

/// Counts how often the pipeline encodes.
struct CountingEncoder {
    calls: Arc<AtomicUsize>,
}

impl Encoder for CountingEncoder {
    fn encode(&self, payload: ImagePayload) -> Result<EncodedImage, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BufferEncoder.encode(payload)
    }
}

fn app_with(model: Arc<StubModel>) -> Router {
    let pipeline = Pipeline::new(Box::new(BufferEncoder), model);
    router(Arc::new(AppState::new(pipeline)))
}

fn multipart(field: &str, filename: &str, content_type: Option<&str>, content: &[u8]) -> Body {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn upload_request(body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/process-image")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_upload_success_envelope() {
    let model = StubModel::new(Reply::Text(
        r#"{"analysis":"a red car","tags":["car","red"],"confidence":0.9}"#,
    ));
    let app = app_with(model.clone());

    let (status, body) = send(
        app,
        upload_request(multipart("file", "car.jpg", Some("image/jpeg"), b"\xFF\xD8\xFF\xE0jpeg")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let data = &body["data"];
    assert_eq!(data["description"], json!("a red car"));
    assert_eq!(data["tags"], json!(["car", "red"]));
    assert_eq!(data["confidence"], json!(0.9));
    assert_eq!(data["id"].as_str().unwrap().len(), 7);
    assert!(data["imageUrl"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert!(data["processedAt"].as_str().unwrap().ends_with('Z'));
    assert_eq!(*model.seen_media.lock().unwrap(), vec!["image/jpeg".to_string()]);
}

#[tokio::test]
async fn test_upload_sniffs_undeclared_type() {
    let model = StubModel::new(Reply::Text("A tiny picture."));
    let (status, body) = send(
        app_with(model.clone()),
        upload_request(multipart("file", "blob", None, PNG)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], json!("A tiny picture."));
    assert_eq!(body["data"]["confidence"], json!(0.8));
    assert_eq!(*model.seen_media.lock().unwrap(), vec!["image/png".to_string()]);
}

#[tokio::test]
async fn test_missing_file_is_bad_request() {
    let model = StubModel::new(Reply::Text("{}"));
    let (status, body) = send(
        app_with(model),
        upload_request(multipart("other", "car.jpg", Some("image/jpeg"), PNG)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "No file provided"}));
}

#[tokio::test]
async fn test_non_image_is_bad_request() {
    let model = StubModel::new(Reply::Text("{}"));
    let (status, body) = send(
        app_with(model.clone()),
        upload_request(multipart("file", "notes.txt", Some("text/plain"), b"hello")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(model.seen_media.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_file_is_bad_request() {
    let model = StubModel::new(Reply::Text("{}"));
    let (status, body) = send(
        app_with(model.clone()),
        upload_request(multipart("file", "empty.png", Some("image/png"), b"")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Failed to process image"));
    assert!(model.seen_media.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let model = StubModel::new(Reply::Unavailable);
    let (status, body) = send(
        app_with(model),
        upload_request(multipart("file", "car.png", Some("image/png"), PNG)),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Failed to process image"));
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_missing_api_key_is_configuration_failure() {
    let client = GeminiClient::new(None, "gemini-2.5-flash").with_base_url("http://127.0.0.1:9");
    let pipeline = Pipeline::new(Box::new(BufferEncoder), Arc::new(client));
    let app = router(Arc::new(AppState::new(pipeline)));

    let (status, body) = send(
        app,
        upload_request(multipart("file", "car.png", Some("image/png"), PNG)),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("GEMINI_API_KEY is not set"));
}

#[tokio::test]
async fn test_store_supplies_id_and_url() {
    let model = StubModel::new(Reply::Text(r#"{"analysis":"a cat"}"#));
    let store = Arc::new(MemoryStore::default());
    let pipeline = Pipeline::new(Box::new(BufferEncoder), model);
    let state = AppState::new(pipeline).with_store(store.clone(), "pics", "uploads");
    let app = router(Arc::new(state));

    let (status, body) = send(
        app,
        upload_request(multipart("file", "cat.png", Some("image/png"), PNG)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!("row-1"));
    assert_eq!(
        body["data"]["imageUrl"],
        json!("https://cdn.test/pics/uploads/cat.png")
    );
    assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_store_failure_does_not_fail_request() {
    let model = StubModel::new(Reply::Text(r#"{"analysis":"a cat"}"#));
    let store = Arc::new(MemoryStore {
        fail_uploads: true,
        ..Default::default()
    });
    let pipeline = Pipeline::new(Box::new(BufferEncoder), model);
    let state = AppState::new(pipeline).with_store(store, "pics", "uploads");
    let app = router(Arc::new(state));

    let (status, body) = send(
        app,
        upload_request(multipart("file", "cat.png", Some("image/png"), PNG)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["imageUrl"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_data_url_analysis() {
    let model = StubModel::new(Reply::Text(
        r#"Sure! {"analysis":"a dog","tags":"dog, grass","confidence":1.4}"#,
    ));
    let request = Request::builder()
        .method("POST")
        .uri("/api/test-ai")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"imageUrl": "data:image/png;base64,iVBORw0KGgo="}).to_string(),
        ))
        .unwrap();

    let (status, body) = send(app_with(model), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"analysis": "a dog", "tags": ["dog", "grass"], "confidence": 1.0})
    );
}

#[tokio::test]
async fn test_data_url_required() {
    let model = StubModel::new(Reply::Text("{}"));
    let request = Request::builder()
        .method("POST")
        .uri("/api/test-ai")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(app_with(model), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("imageUrl is required"));
}

#[tokio::test]
async fn test_health_and_index() {
    let model = StubModel::new(Reply::Text("{}"));
    let app = app_with(model);

    let (status, body) = send(
        app.clone(),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8_lossy(&html);
    assert!(html.contains("/api/process-image"));
    assert!(html.contains("Max 5 MB"));
}

#[tokio::test]
async fn test_index_shows_configured_limit() {
    let model = StubModel::new(Reply::Text("{}"));
    let pipeline = Pipeline::new(Box::new(BufferEncoder), model);
    let app = router(Arc::new(AppState::new(pipeline).with_upload_limit(10 * 1024 * 1024)));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let html = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8_lossy(&html);
    assert!(html.contains("Max 10 MB"));
    assert!(html.contains("const MAX_UPLOAD_BYTES = 10485760;"));
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let model = StubModel::new(Reply::Text("{}"));
    let pipeline = Pipeline::new(Box::new(BufferEncoder), model.clone());
    let app = router(Arc::new(AppState::new(pipeline).with_upload_limit(1024)));

    let (status, body) = send(
        app,
        upload_request(multipart("file", "big.png", Some("image/png"), &[0u8; 4096])),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("File exceeds the upload size limit"));
    assert!(model.seen_media.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_encodes_once() {
    let model = StubModel::new(Reply::Text(r#"{"analysis":"a red car"}"#));
    let calls = Arc::new(AtomicUsize::new(0));
    let encoder = CountingEncoder {
        calls: calls.clone(),
    };
    let app = router(Arc::new(AppState::new(Pipeline::new(Box::new(encoder), model))));

    let (status, body) = send(
        app,
        upload_request(multipart("file", "car.png", Some("image/png"), PNG)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["imageUrl"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,iVBORw"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
