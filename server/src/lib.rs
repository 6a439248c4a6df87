use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use search_core::persist::{load_index, IndexPaths};
use search_core::{search_with, DocCount, DocId, InvertedIndex, SearchHit, SearchOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocId,
    pub title: String,
    pub magnitude: f64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub num_terms: usize,
    pub num_docs: usize,
    pub num_postings: usize,
    pub doc_count: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub doc_count: DocCount,
    pub admin_token: Option<String>,
    /// Comma-separated list of allowed origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
}

impl ServerConfig {
    /// Config for `index_dir`, with `ADMIN_TOKEN` and `CORS_ALLOW_ORIGIN` read from the environment.
    pub fn from_env(index_dir: impl Into<PathBuf>, doc_count: DocCount) -> Self {
        Self {
            index_dir: index_dir.into(),
            doc_count,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths: IndexPaths,
    /// Swapped wholesale on reload; queries clone the inner Arc and never hold the lock while scoring.
    pub index: Arc<RwLock<Arc<InvertedIndex>>>,
    pub doc_count: DocCount,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current_index(&self) -> Arc<InvertedIndex> { self.index.read().clone() }
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    // Load the index at startup; the server refuses to start without one
    let index_paths = IndexPaths::new(&config.index_dir);
    let index = load_index(&index_paths)?;
    let app_state = AppState {
        index_paths,
        index: Arc::new(RwLock::new(Arc::new(index))),
        doc_count: config.doc_count,
        admin_token: config.admin_token,
    };

    let cors = match config.cors_allow_origin.as_deref() {
        Some(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let index = state.current_index();
    let options = SearchOptions { doc_count: state.doc_count, limit: None };
    let hits = search_with(&params.q, &index, &options);

    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);
    let results: Vec<SearchHit> = hits.into_iter().take(k).collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total_hits, took_s = elapsed.as_secs_f64(), "search");
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<DocResponse>, ApiError> {
    let index = state.current_index();
    let title = index
        .title(doc_id)
        .ok_or_else(|| ApiError::NotFound(format!("document {doc_id} not found")))?;
    Ok(Json(DocResponse { doc_id, title: title.to_string(), magnitude: index.doc_norm(doc_id) }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let index = state.current_index();
    Json(StatsResponse {
        num_terms: index.num_terms(),
        num_docs: index.num_docs(),
        num_postings: index.num_postings(),
        doc_count: state.doc_count.to_string(),
    })
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let paths = state.index_paths.clone();
    let loaded = tokio::task::spawn_blocking(move || load_index(&paths))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match loaded {
        Ok(index) => {
            let (num_terms, num_docs) = (index.num_terms(), index.num_docs());
            *state.index.write() = Arc::new(index);
            tracing::info!(num_terms, num_docs, "index reloaded");
            Ok(Json(serde_json::json!({ "reloaded": true, "num_terms": num_terms, "num_docs": num_docs })))
        }
        Err(e) => {
            tracing::warn!(error = %e, "index reload failed, keeping current index");
            Err(ApiError::ServiceUnavailable(e.to_string()))
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
