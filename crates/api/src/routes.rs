use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    routing::{delete, get, post},
};
use extract::{EntityMap, LanguageModel};
use query::{DocumentQa, Exchange, QaAnswer, SessionStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use analyze::FormattedReport;

use crate::cache::LlmCache;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::pipeline::DocumentPipeline;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub struct AppState {
    pub config: AppConfig,
    pub pipeline: DocumentPipeline,
    pub sessions: SessionStore,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub recognizer_configured: bool,
    pub metrics: Arc<Metrics>,
    pub cache: Option<Arc<LlmCache>>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit =
        state.config.limits.max_file_size_mb as usize * 1024 * 1024 + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/extract", post(extract_document))
        .route("/api/v1/metrics", get(get_metrics))
        .route("/api/v1/qa/create-session", post(create_session))
        .route("/api/v1/qa/ask", post(ask_question))
        .route("/api/v1/qa/ask-multiple", post(ask_multiple))
        .route("/api/v1/qa/history/:session_id", get(get_history))
        .route("/api/v1/qa/session/:session_id", delete(delete_session))
        .route("/api/v1/qa/suggestions/:session_id", get(get_suggestions))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "ADOR API is running",
        "version": VERSION,
        "features": [
            "Entity Extraction",
            "Document Classification",
            "Summarization",
            "Topic Modelling",
            "Question Answering",
        ],
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    llm_configured: bool,
    recognizer_configured: bool,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
        llm_configured: state.llm.is_some(),
        recognizer_configured: state.recognizer_configured,
    })
}

/// Body-limit rejections surface as 413, anything else as a malformed request.
fn upload_error(err: MultipartError, limit_mb: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::UploadTooLarge { limit_mb }
    } else {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

async fn extract_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FormattedReport>, ApiError> {
    let limit_mb = state.config.limits.max_file_size_mb;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit_mb))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| upload_error(e, limit_mb))?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, content)) = upload else {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    };

    let request_id = Uuid::new_v4();
    let span = info_span!("extract", %request_id, filename = %filename, bytes = content.len());

    let result = state
        .pipeline
        .process(&content, &filename)
        .instrument(span)
        .await;

    state.metrics.record_request(result.is_ok());
    Ok(Json(result?))
}

#[derive(Serialize)]
struct MetricsResponse {
    requests: crate::metrics::MetricsSnapshot,
    cache: Option<crate::cache::CacheStats>,
    active_sessions: usize,
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        requests: state.metrics.snapshot(),
        cache: state.cache.as_ref().map(|c| c.stats()),
        active_sessions: state.sessions.len(),
    })
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    session_id: String,
    document_text: String,
    #[serde(default)]
    entities: Option<EntityMap>,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Json<Value> {
    let Some(llm) = state.llm.clone() else {
        return Json(json!({
            "success": false,
            "error": "OpenAI API key not configured",
            "message": "Q&A requires a valid OpenAI API key",
        }));
    };

    let qa = DocumentQa::new(Some(llm), req.document_text, req.entities.unwrap_or_default());
    let suggestions = qa.suggested_questions();
    state.sessions.create(&req.session_id, qa);

    Json(json!({
        "success": true,
        "session_id": req.session_id,
        "message": "Q&A session created successfully",
        "suggested_questions": suggestions,
    }))
}

#[derive(Deserialize)]
struct QuestionRequest {
    session_id: String,
    question: String,
}

async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QaAnswer>, ApiError> {
    let session = state
        .sessions
        .get(&req.session_id)
        .ok_or_else(ApiError::session_not_found)?;

    let answer = session.lock().await.ask(&req.question).await;
    state.metrics.record_questions(1);
    Ok(Json(answer))
}

#[derive(Deserialize)]
struct MultipleQuestionsRequest {
    session_id: String,
    questions: Vec<String>,
}

#[derive(Serialize)]
struct MultipleAnswersResponse {
    success: bool,
    answers: Vec<QaAnswer>,
}

async fn ask_multiple(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultipleQuestionsRequest>,
) -> Result<Json<MultipleAnswersResponse>, ApiError> {
    let session = state
        .sessions
        .get(&req.session_id)
        .ok_or_else(ApiError::session_not_found)?;

    let answers = session.lock().await.ask_multiple(&req.questions).await;
    state.metrics.record_questions(answers.len());
    Ok(Json(MultipleAnswersResponse {
        success: true,
        answers,
    }))
}

#[derive(Serialize)]
struct HistoryResponse {
    success: bool,
    session_id: String,
    history: Vec<Exchange>,
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(ApiError::session_not_found)?;

    let history = session.lock().await.history().to_vec();
    Ok(Json(HistoryResponse {
        success: true,
        session_id,
        history,
    }))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.sessions.delete(&session_id) {
        return Err(ApiError::session_not_found());
    }
    info!(session_id = %session_id, "Session removed by client");
    Ok(Json(json!({ "success": true, "message": "Session deleted" })))
}

async fn get_suggestions(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(ApiError::session_not_found)?;

    let suggestions = session.lock().await.suggested_questions();
    Ok(Json(json!({ "success": true, "suggestions": suggestions })))
}
