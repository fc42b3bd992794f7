//! HTTP server for the collections API.
//!
//! Exposes the collection registry and the posts in each collection's
//! folder as read-only JSON, mounted under `[server].mount` (default
//! `/ncms`).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/collections` | All collections, in configuration order |
//! | `GET`  | `/collections/{name}` | One collection |
//! | `GET`  | `/collections/{name}/posts` | Posts of a collection, without `content` |
//! | `GET`  | `/collections/{name}/posts/{slug}` | One post, with `content` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Unknown collections and slugs fall through to the same handler as
//! unknown routes, which renders `404`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "parse_error", "message": "failed to parse metadata in ..." } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `not_found` | 404 | Unknown route, collection, or slug |
//! | `timeout` | 503 | A collection scan exceeded `[server].request_timeout_secs`; the server was slow, not the client, so this is not 408 |
//! | `parse_error` | 500 | A document's metadata failed to decode |
//! | `internal` | 500 | The collection folder is missing or unreadable |
//!
//! # Caching
//!
//! Nothing is cached server-side; every posts request rescans the folder.
//! Successful responses carry an `ETag` derived from the body. An
//! `If-None-Match` listing that tag (weak or strong), or `*`, short-circuits
//! to `304 Not Modified`.

use axum::{
    extract::{OriginalUri, Path, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use anyhow::Context;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ScanError;
use crate::models::{sort_posts, Collection, Post};
use crate::registry::Registry;
use crate::scanner;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    /// Collection registry, built once at startup.
    registry: Arc<Registry>,
    /// Upper bound for one collection scan.
    request_timeout: Duration,
}

/// Starts the collections API server.
///
/// Binds to `[server].bind` and serves until the process receives Ctrl-C.
pub async fn run_server(config: &Config, registry: Arc<Registry>) -> anyhow::Result<()> {
    let app = build_router(
        registry,
        &config.server.mount,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        mount = %config.server.mount,
        "ncms server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Builds the router with every collections route nested under `mount`.
///
/// The registry is injected here; handlers never reach for global state.
pub fn build_router(registry: Arc<Registry>, mount: &str, request_timeout: Duration) -> Router {
    let state = AppState {
        registry,
        request_timeout,
    };

    let api = Router::new()
        .route("/collections", get(handle_list_collections))
        .route("/collections/{name}", get(handle_get_collection))
        .route("/collections/{name}/posts", get(handle_list_posts))
        .route("/collections/{name}/posts/{slug}", get(handle_get_post))
        .route("/health", get(handle_health));

    let mount = mount.trim_end_matches('/');
    let app = if mount.is_empty() {
        api
    } else {
        Router::new().nest(mount, api)
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.fallback(handle_fallback)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"not_found"`, `"parse_error"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// The response for anything this API does not handle.
fn fallthrough(uri: &Uri) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: format!("not found: {}", uri.path()),
    }
}

/// Constructs a 503 error for a scan that ran out of time.
fn timeout_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "timeout".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for unexpected failures.
fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps a failed scan to a response. Parse errors name the offending file
/// so content authors can fix it; filesystem errors are logged and kept
/// distinct from "not found".
fn scan_error(collection: &str, err: ScanError) -> AppError {
    match err {
        ScanError::Parse(e) => {
            tracing::warn!(collection, error = %e, "malformed document");
            AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "parse_error".to_string(),
                message: e.to_string(),
            }
        }
        other => {
            tracing::error!(collection, error = %other, "collection scan failed");
            internal_error(format!("collection '{collection}': {other}"))
        }
    }
}

// ============ Responses ============

/// Serializes `value` as JSON with an `ETag`, or answers `304` when the
/// client already holds the same body.
fn json_response<T: Serialize>(headers: &HeaderMap, value: &T) -> Result<Response, AppError> {
    let body = serde_json::to_vec(value).map_err(|e| internal_error(e.to_string()))?;
    let etag = compute_etag(&body);

    if headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| etag_matches(v, &etag))
    {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::ETAG, etag),
        ],
        body,
    )
        .into_response())
}

/// Weak comparison of an `If-None-Match` value against our tag.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// Quoted SHA-256 of the body, truncated to 16 hex chars.
fn compute_etag(body: &[u8]) -> String {
    let hash = Sha256::digest(body);
    format!("\"{}\"", &hex::encode(hash)[..16])
}

/// Scans a collection within the request timeout, sorted for output.
async fn load_posts(state: &AppState, collection: &Collection) -> Result<Vec<Post>, AppError> {
    let mut posts = match tokio::time::timeout(state.request_timeout, scanner::scan(collection)).await
    {
        Ok(Ok(posts)) => posts,
        Ok(Err(e)) => return Err(scan_error(&collection.name, e)),
        Err(_) => {
            tracing::warn!(collection = %collection.name, "collection scan timed out");
            return Err(timeout_error(format!(
                "scan of collection '{}' timed out after {:?}",
                collection.name,
                state.request_timeout
            )));
        }
    };
    sort_posts(&mut posts);
    Ok(posts)
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Fallback ============

async fn handle_fallback(OriginalUri(uri): OriginalUri) -> AppError {
    fallthrough(&uri)
}

// ============ GET /collections ============

async fn handle_list_collections(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    json_response(&headers, &state.registry.list())
}

// ============ GET /collections/{name} ============

async fn handle_get_collection(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let collection = state
        .registry
        .lookup(&name)
        .ok_or_else(|| fallthrough(&uri))?;
    json_response(&headers, collection)
}

// ============ GET /collections/{name}/posts ============

/// Lists a collection's posts. `content` is always omitted here; fetch a
/// single post for its body.
async fn handle_list_posts(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let collection = state
        .registry
        .lookup(&name)
        .ok_or_else(|| fallthrough(&uri))?;

    let posts: Vec<Post> = load_posts(&state, collection)
        .await?
        .into_iter()
        .map(Post::without_content)
        .collect();

    json_response(&headers, &posts)
}

// ============ GET /collections/{name}/posts/{slug} ============

/// Returns one post by slug. There is no slug index: the whole collection
/// is scanned and a malformed sibling document fails the lookup.
async fn handle_get_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((name, slug)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let collection = state
        .registry
        .lookup(&name)
        .ok_or_else(|| fallthrough(&uri))?;

    let post = load_posts(&state, collection)
        .await?
        .into_iter()
        .find(|p| p.slug == slug)
        .ok_or_else(|| fallthrough(&uri))?;

    json_response(&headers, &post)
}
