use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use docfind_core::decode::DecoderRegistry;
use docfind_core::highlight::{count_occurrences, Highlighter};
use docfind_core::persist::Persistence;
use docfind_core::{Document, Error, SearchEngine, DEFAULT_SUGGESTION_LIMIT};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub type Engine = SearchEngine<Box<dyn Persistence + Send>>;

/// Settings read from the environment.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Required in `X-ADMIN-TOKEN` to clear all documents. Clearing is
    /// refused when unset.
    pub admin_token: Option<String>,
    /// Allowed CORS origins; any origin when empty.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// `ADMIN_TOKEN` and comma-separated `CORS_ALLOW_ORIGIN`.
    pub fn from_env() -> Self {
        let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());
        let cors_origins = std::env::var("CORS_ALLOW_ORIGIN")
            .map(|val| val.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        Self { admin_token, cors_origins }
    }
}

/// Uploads and clears take the engine lock, so ingestion is one document at
/// a time.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<Engine>>,
    pub decoders: Arc<DecoderRegistry>,
    pub highlighter: Arc<Highlighter>,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { DEFAULT_SUGGESTION_LIMIT }

#[derive(Deserialize)]
pub struct ViewParams {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct UploadParams {
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub word_count: usize,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self { id: doc.id.clone(), name: doc.name.clone(), word_count: doc.word_count }
    }
}

#[derive(Serialize)]
pub struct DocumentList {
    pub count: usize,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Serialize)]
pub struct DocumentView {
    pub id: String,
    pub name: String,
    pub word_count: usize,
    pub html: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub frequency: u32,
    /// Case-insensitive occurrences of the query in the document.
    pub occurrences: usize,
}

#[derive(Serialize)]
pub struct Suggestions {
    pub suggestions: Vec<String>,
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn build_app(engine: Engine, config: ServerConfig) -> Router {
    let state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        decoders: Arc::new(DecoderRegistry::new()),
        highlighter: Arc::new(Highlighter::default()),
        admin_token: config.admin_token,
    };

    let origins: Vec<_> = config.cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/documents", get(list_documents).post(add_document).delete(clear_documents))
        .route("/documents/:id", get(view_document))
        .route("/upload", post(upload))
        .route("/search", get(search_handler))
        .route("/suggest", get(suggest_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentList> {
    let engine = state.engine.lock();
    let documents: Vec<DocumentSummary> = engine.documents().iter().map(DocumentSummary::from).collect();
    Json(DocumentList { count: documents.len(), documents })
}

pub async fn add_document(State(state): State<AppState>, Json(doc): Json<NewDocument>) -> ApiResult<(StatusCode, Json<DocumentSummary>)> {
    let added = state.engine.lock().add_document(&doc.name, &doc.content).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(DocumentSummary::from(&added))))
}

/// Raw file upload; the format comes from the `name` extension.
pub async fn upload(State(state): State<AppState>, Query(params): Query<UploadParams>, body: Bytes) -> ApiResult<(StatusCode, Json<DocumentSummary>)> {
    let content = state.decoders.decode(&params.name, &body).map_err(|err| {
        tracing::warn!(file = %params.name, error = %err, "rejected upload");
        error_response(err)
    })?;
    let added = state.engine.lock().add_document(&params.name, &content).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(DocumentSummary::from(&added))))
}

pub async fn view_document(State(state): State<AppState>, Path(id): Path<String>, Query(params): Query<ViewParams>) -> ApiResult<Json<DocumentView>> {
    let engine = state.engine.lock();
    let doc = engine.document(&id).map_err(error_response)?;
    let term = params.q.as_deref().map(str::trim).unwrap_or("");
    Ok(Json(DocumentView {
        id: doc.id.clone(),
        name: doc.name.clone(),
        word_count: doc.word_count,
        html: state.highlighter.highlight(&doc.content, term),
    }))
}

pub async fn clear_documents(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    authorize(&state, &headers)?;
    state.engine.lock().clear_all().map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<Json<SearchResponse>> {
    let start = std::time::Instant::now();
    let results = state.engine.lock().search(&params.q).map_err(error_response)?;
    let hits: Vec<SearchHit> = results
        .iter()
        .map(|r| SearchHit {
            id: r.document.id.clone(),
            name: r.document.name.clone(),
            frequency: r.frequency,
            occurrences: count_occurrences(&r.document.content, &r.search_term),
        })
        .collect();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: hits.len(), results: hits }))
}

pub async fn suggest_handler(State(state): State<AppState>, Query(params): Query<SuggestParams>) -> Json<Suggestions> {
    let suggestions = state.engine.lock().suggest(&params.q, params.limit);
    Json(Suggestions { suggestions })
}

fn error_response(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::EmptyQuery => StatusCode::BAD_REQUEST,
        Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
        Error::UnsupportedFormat(_) | Error::DecodeFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => {
            tracing::error!(error = %err, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
