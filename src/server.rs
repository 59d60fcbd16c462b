//! HTTP server for the xiVIEW client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/get_data?project=<acc>[&file=<name>]` | Assembled network data |
//! | `GET`  | `/get_peaklist?id=<sid>&sd_ref=<ref>&upload_id=<n>` | Decoded peaklist |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Storage failures keep the body existing xiVIEW clients check for:
//!
//! ```json
//! { "error": "Database error" }
//! ```
//!
//! The cause and stage are logged, never returned. Every other error carries
//! a code and a message:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no peaklist for ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `decode_error` (500),
//! `timeout` (504).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the viewer is served
//! from a different origin.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use xiview_data_core::error::FetchError;
use xiview_data_core::models::{NetworkData, Peaklist};
use xiview_data_core::store::Store;

use crate::config::Config;
use crate::network::get_network_data;
use crate::peaklist::get_peaklist;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }
}

/// Build the router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/get_data", get(handle_get_data))
        .route("/get_peaklist", get(handle_get_peaklist))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Serve `state` on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// `xiview serve`: open the database read-only and listen on `[server].bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::connect(config).await?;
    let timeout = config.server.request_timeout_secs.map(Duration::from_secs);
    let state = AppState::new(Arc::new(store), timeout);

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        db = %config.db.path.display(),
        "xiview server listening"
    );
    serve(listener, state).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct FlatErrorBody {
    error: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    /// Render as `{"error": "<message>"}`.
    flat: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.flat {
            let body = FlatErrorBody {
                error: self.message,
            };
            return (self.status, Json(body)).into_response();
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
        flat: false,
    }
}

fn timeout_error(limit: Duration) -> AppError {
    AppError {
        status: StatusCode::GATEWAY_TIMEOUT,
        code: "timeout",
        message: format!("request exceeded {}s", limit.as_secs()),
        flat: false,
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Storage { stage, source } => {
                error!(%stage, error = %format!("{:#}", source), "storage failure");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "database_error",
                    message: "Database error".to_string(),
                    flat: true,
                }
            }
            FetchError::SpectrumNotFound(key) => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message: format!("no peaklist for {}", key),
                flat: false,
            },
            FetchError::Decode(e) => {
                warn!(error = %e, "malformed peaklist");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "decode_error",
                    message: e.to_string(),
                    flat: false,
                }
            }
        }
    }
}

/// Run `fut` under the configured request limit.
///
/// On expiry the future is dropped, which drops its read session and
/// returns the connection to the pool.
async fn bounded<T, F>(limit: Option<Duration>, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(timeout_error(limit)),
        },
        None => fut.await.map_err(AppError::from),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /get_data ============

#[derive(Debug, Deserialize)]
struct GetDataParams {
    project: String,
    #[serde(default)]
    file: Option<String>,
}

async fn handle_get_data(
    State(state): State<AppState>,
    params: Result<Query<GetDataParams>, QueryRejection>,
) -> Result<Json<NetworkData>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    if params.project.trim().is_empty() {
        return Err(bad_request("project must not be empty"));
    }
    let file = params.file.as_deref().filter(|f| !f.is_empty());

    let data = bounded(
        state.timeout,
        get_network_data(state.store.as_ref(), &params.project, file),
    )
    .await?;
    Ok(Json(data))
}

// ============ GET /get_peaklist ============

#[derive(Debug, Deserialize)]
struct GetPeaklistParams {
    id: String,
    sd_ref: String,
    upload_id: i64,
}

async fn handle_get_peaklist(
    State(state): State<AppState>,
    params: Result<Query<GetPeaklistParams>, QueryRejection>,
) -> Result<Json<Peaklist>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;

    let peaks = bounded(
        state.timeout,
        get_peaklist(
            state.store.as_ref(),
            &params.id,
            &params.sd_ref,
            params.upload_id,
        ),
    )
    .await?;
    Ok(Json(peaks))
}
