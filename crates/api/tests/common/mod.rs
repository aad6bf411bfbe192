#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use catalog_core::storage::{FileStore, LocalFileStore, StorageError, StorageResult};
use catalog_core::types::DbId;
use catalog_core::uploads::UploadManager;
use catalog_db::models::category::CreateCategory;
use catalog_db::models::genre::CreateGenre;
use catalog_db::repositories::{CategoryRepo, GenreRepo};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use catalog_api::config::ServerConfig;
use catalog_api::routes;
use catalog_api::state::AppState;

pub const STORAGE_BASE_URL: &str = "http://localhost:3000/storage";

/// Build a test `ServerConfig` with safe defaults, rooted at `storage_root`.
pub fn test_config(storage_root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        storage_root,
        storage_base_url: STORAGE_BASE_URL.to_string(),
        max_upload_bytes: 64 * 1024 * 1024,
    }
}

/// A router plus the temporary storage it writes into.
///
/// Keep the whole value alive for the duration of the test; dropping it
/// removes the storage directory.
pub struct TestApp {
    pub router: Router,
    pub uploads: UploadManager,
    pub storage: TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Absolute path of `{video_id}/{name}` inside the test storage.
    pub fn stored_path(&self, video_id: &str, name: &str) -> PathBuf {
        self.storage.path().join(video_id).join(name)
    }
}

/// Build the full application backed by a `LocalFileStore` in a temp dir.
pub async fn build_test_app(pool: PgPool) -> TestApp {
    let storage = tempfile::tempdir().unwrap();
    let store = LocalFileStore::new(storage.path()).await.unwrap();
    build_test_app_with_store(pool, storage, Arc::new(store))
}

/// Build the full application with all middleware layers around a custom
/// file store.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack production uses.
pub fn build_test_app_with_store(
    pool: PgPool,
    storage: TempDir,
    store: Arc<dyn FileStore>,
) -> TestApp {
    let config = test_config(storage.path().to_path_buf());
    let uploads = UploadManager::new(store).with_public_base_url(STORAGE_BASE_URL);

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        uploads: uploads.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .nest_service("/storage", ServeDir::new(&config.storage_root))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        uploads,
        storage,
    }
}

// ---------------------------------------------------------------------------
// File stores with injected failures
// ---------------------------------------------------------------------------

/// Delegates to a `LocalFileStore` but fails every `put` after the first
/// `allowed_puts` succeed.
pub struct FlakyStore {
    inner: LocalFileStore,
    allowed_puts: usize,
    puts: AtomicUsize,
}

impl FlakyStore {
    pub async fn new(root: &std::path::Path, allowed_puts: usize) -> Self {
        Self {
            inner: LocalFileStore::new(root).await.unwrap(),
            allowed_puts,
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FileStore for FlakyStore {
    async fn put(&self, directory: &str, name: &str, data: &[u8]) -> StorageResult<()> {
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.allowed_puts {
            return Err(StorageError::UploadFailed(format!(
                "injected failure writing {directory}/{name}"
            )));
        }
        self.inner.put(directory, name, data).await
    }

    async fn delete(&self, directory: &str, name: &str) -> StorageResult<()> {
        self.inner.delete(directory, name).await
    }

    async fn exists(&self, directory: &str, name: &str) -> StorageResult<bool> {
        self.inner.exists(directory, name).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_category(pool: &PgPool, name: &str) -> DbId {
    CategoryRepo::create(
        pool,
        &CreateCategory {
            name: name.to_string(),
            description: None,
            is_active: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn create_genre(pool: &PgPool, name: &str, categories_id: Vec<DbId>) -> DbId {
    GenreRepo::create(
        pool,
        &CreateGenre {
            name: name.to_string(),
            is_active: None,
            categories_id,
        },
    )
    .await
    .unwrap()
    .id
}

/// One category and one genre linked to it.
pub async fn linked_pair(pool: &PgPool) -> (DbId, DbId) {
    let category = create_category(pool, "Movies").await;
    let genre = create_genre(pool, "Drama", vec![category]).await;
    (category, genre)
}

/// Scalar fields of a valid video submission.
pub fn video_scalars() -> Vec<(&'static str, &'static str)> {
    vec![
        ("title", "title"),
        ("description", "description"),
        ("year_launched", "2010"),
        ("rating", "L"),
        ("duration", "90"),
    ]
}

/// A valid JSON video submission for the given relations.
pub fn video_json(category: DbId, genre: DbId) -> serde_json::Value {
    serde_json::json!({
        "title": "title",
        "description": "description",
        "year_launched": 2010,
        "rating": "L",
        "duration": 90,
        "categories_id": [category],
        "genres_id": [genre],
    })
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

pub const BOUNDARY: &str = "catalog-test-boundary";

/// A file part: field name, file name, content type, bytes.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

/// Encode text fields and file parts as a `multipart/form-data` body.
pub fn multipart_body(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn send_multipart(app: Router, method: Method, uri: &str, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    send_json(app, Method::POST, uri, json).await
}

pub async fn put_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    send_json(app, Method::PUT, uri, json).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send_json(app: Router, method: Method, uri: &str, json: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&json).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
