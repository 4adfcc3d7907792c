//! HTTP routes and their JSON shapes.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use super::pool::PoolError;
use super::state::AppState;
use crate::corpus::CorpusError;
use crate::documents::{Document, DocumentFormat, ExtractError};
use crate::pipeline::{FailedDocument, IngestError, ReindexError};
use crate::retrieval::{
    GenerationError, LegalDocumentRiskAssessment, RetrievalError, RiskSummary,
    Source, looks_like_legal_document,
};
use crate::vector::IndexError;

/// Slack on top of the upload limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(root))
        .route(
            "/upload-document",
            post(upload_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/chat", post(chat))
        .route("/risk-assessment", post(risk_assessment))
        .route("/documents", get(list_documents))
        .route("/reindex", post(reindex))
        .route("/status/{filename}", get(document_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error response: `{ "error": message, "kind": kind }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(target: "http", "{} {}: {}", self.status, self.kind, self.message);
        } else {
            tracing::debug!(target: "http", "{} {}: {}", self.status, self.kind, self.message);
        }
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedFormat { .. } => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_format",
                e.to_string(),
            ),
            ExtractError::ExtractionFailed { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "extraction_failed",
                e.to_string(),
            ),
        }
    }
}

impl From<IndexError> for ApiError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::DuplicateDocument(_) => {
                Self::new(StatusCode::CONFLICT, "duplicate_document", e.to_string())
            }
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "index_error", e.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "generation_failed", e.to_string())
    }
}

impl From<CorpusError> for ApiError {
    fn from(e: CorpusError) -> Self {
        match e {
            CorpusError::InvalidName(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_name", e.to_string())
            }
            CorpusError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "document_not_found", e.to_string())
            }
            CorpusError::Io { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "corpus_error", e.to_string())
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Extract(e) => e.into(),
            IngestError::NoChunks(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "extraction_failed",
                e.to_string(),
            ),
            IngestError::Embedding(e) => {
                Self::new(StatusCode::BAD_GATEWAY, "embedding_failed", e.to_string())
            }
            IngestError::Index(e) => e.into(),
            IngestError::Corpus(e) => e.into(),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::EmptyQuery => {
                Self::new(StatusCode::BAD_REQUEST, "empty_query", e.to_string())
            }
            RetrievalError::Embedding(e) => {
                Self::new(StatusCode::BAD_GATEWAY, "embedding_failed", e.to_string())
            }
            RetrievalError::Index(e) => e.into(),
            RetrievalError::Generation(e) => e.into(),
            RetrievalError::DocumentNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "document_not_found", e.to_string())
            }
            RetrievalError::MalformedAssessment(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                "malformed_assessment",
                e.to_string(),
            ),
        }
    }
}

impl From<ReindexError> for ApiError {
    fn from(e: ReindexError) -> Self {
        match e {
            ReindexError::InProgress => {
                Self::new(StatusCode::CONFLICT, "reindex_in_progress", e.to_string())
            }
            ReindexError::Corpus(e) => e.into(),
        }
    }
}

impl From<PoolError> for ApiError {
    fn from(e: PoolError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "worker_failed", e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
    documents_loaded: usize,
    total_chunks: usize,
    corpus: String,
    endpoints: Vec<&'static str>,
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let services = &state.services;
    let index = services.index.current();

    Json(RootResponse {
        message: "Document retrieval service",
        status: if services.index.is_reindexing() {
            "reindexing"
        } else {
            "ready"
        },
        documents_loaded: index.document_count(),
        total_chunks: index.len(),
        corpus: services.corpus.location(),
        endpoints: vec![
            "POST /upload-document",
            "POST /chat",
            "POST /risk-assessment",
            "GET /documents",
            "POST /reindex",
            "GET /status/{filename}",
        ],
    })
}

// ---------------------------------------------------------------------------
// POST /upload-document
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UploadParams {
    #[serde(default = "default_include_risk")]
    include_risk_assessment: bool,
}

fn default_include_risk() -> bool {
    true
}

#[derive(Serialize)]
pub struct UploadResponse {
    success: bool,
    message: String,
    filename: String,
    uri: String,
    chunks_indexed: usize,
    has_risk_assessment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_assessment: Option<LegalDocumentRiskAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_summary: Option<RiskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_error: Option<String>,
}

/// Last path component of a client-supplied file name.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

async fn read_upload(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    let mut upload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(base_name).unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::bad_request("multipart field 'file' is required"))?;
    if filename.is_empty() {
        return Err(ApiError::bad_request("uploaded file has no name"));
    }
    Ok((filename, data))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", e.body_text())
    } else {
        ApiError::bad_request(e.body_text())
    }
}

async fn upload_document(
    State(state): State<AppState>,
    params: Result<Query<UploadParams>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let Query(params) = params?;
    let (filename, data) = read_upload(&mut multipart).await?;

    let format = DocumentFormat::from_name(&filename)
        .ok_or_else(|| ApiError::from(ExtractError::unsupported(&filename)))?;
    if data.len() > state.max_upload_bytes {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            format!(
                "{filename} is {} bytes, limit is {}",
                data.len(),
                state.max_upload_bytes
            ),
        ));
    }

    let services = &state.services;
    if services.index.is_claimed(&filename) || services.index.current().contains_document(&filename)
    {
        return Err(IndexError::DuplicateDocument(filename).into());
    }

    crate::log_event!("http", "upload", "{filename} ({} bytes)", data.len());

    let processor = services.processor.clone();
    let handle = services.index.clone();
    let corpus = services.corpus.clone();
    let document = Document::new(filename.clone(), data.to_vec());
    let report = state
        .pool
        .run(move || processor.ingest(&handle, corpus.as_ref(), &document))
        .await??;

    let full_text = services
        .index
        .current()
        .document_chunks(&filename)
        .map(|chunks| {
            chunks
                .into_iter()
                .map(|chunk| chunk.content)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let mut response = UploadResponse {
        success: true,
        message: "Document uploaded and processed successfully".to_string(),
        filename: filename.clone(),
        uri: report.uri,
        chunks_indexed: report.chunks_indexed,
        has_risk_assessment: false,
        risk_assessment: None,
        risk_summary: None,
        risk_error: None,
    };

    let wants_assessment = params.include_risk_assessment
        && format.is_office_document()
        && looks_like_legal_document(&full_text);
    if wants_assessment {
        let orchestrator = services.orchestrator.clone();
        let name = filename.clone();
        // A failed assessment never fails the upload.
        match state.pool.run(move || orchestrator.assess_risk(&name)).await {
            Ok(Ok(assessment)) => {
                response.risk_summary = Some(RiskSummary::from(&assessment));
                response.risk_assessment = Some(assessment);
                response.has_risk_assessment = true;
            }
            Ok(Err(e)) => {
                tracing::warn!(target: "http", "risk assessment failed for {filename}: {e}");
                response.risk_error = Some(e.to_string());
            }
            Err(e) => response.risk_error = Some(e.to_string()),
        }
    }

    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// POST /chat
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    max_context_chunks: Option<usize>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    response: String,
    sources: Vec<Source>,
    context_used: bool,
    query: String,
}

async fn chat(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = request?;
    if request.query.trim().is_empty() {
        return Err(RetrievalError::EmptyQuery.into());
    }
    let top_k = state.retrieval.clamp_top_k(request.max_context_chunks);

    let orchestrator = state.services.orchestrator.clone();
    let query = request.query.clone();
    let answer = state
        .pool
        .run(move || orchestrator.answer(&query, top_k))
        .await??;

    Ok(Json(ChatResponse {
        response: answer.response().to_string(),
        sources: answer.sources().to_vec(),
        context_used: answer.context_used(),
        query: request.query,
    }))
}

// ---------------------------------------------------------------------------
// POST /risk-assessment
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RiskAssessmentRequest {
    document_name: String,
}

#[derive(Serialize)]
pub struct RiskAssessmentResponse {
    success: bool,
    document_name: String,
    risk_assessment: LegalDocumentRiskAssessment,
    risk_summary: RiskSummary,
    assessed_at: DateTime<Utc>,
}

async fn risk_assessment(
    State(state): State<AppState>,
    request: Result<Json<RiskAssessmentRequest>, JsonRejection>,
) -> Result<Json<RiskAssessmentResponse>, ApiError> {
    let Json(request) = request?;
    let name = request.document_name;
    if !state.services.index.current().contains_document(&name) {
        return Err(RetrievalError::DocumentNotFound(name).into());
    }

    let orchestrator = state.services.orchestrator.clone();
    let lookup = name.clone();
    let assessment = state
        .pool
        .run(move || orchestrator.assess_risk(&lookup))
        .await??;

    Ok(Json(RiskAssessmentResponse {
        success: true,
        document_name: name,
        risk_summary: RiskSummary::from(&assessment),
        risk_assessment: assessment,
        assessed_at: Utc::now(),
    }))
}

// ---------------------------------------------------------------------------
// GET /documents
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct DocumentsResponse {
    documents: Vec<String>,
    total_chunks: usize,
    corpus: String,
}

async fn list_documents(State(state): State<AppState>) -> Json<DocumentsResponse> {
    let index = state.services.index.current();
    Json(DocumentsResponse {
        documents: index.document_names(),
        total_chunks: index.len(),
        corpus: state.services.corpus.location(),
    })
}

// ---------------------------------------------------------------------------
// POST /reindex
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ReindexResponse {
    message: &'static str,
    documents_attempted: usize,
    documents_processed: usize,
    documents_skipped: usize,
    failures: Vec<FailedDocument>,
    total_chunks: usize,
}

async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexResponse>, ApiError> {
    let handle = state.services.index.clone();
    if handle.is_reindexing() {
        return Err(ReindexError::InProgress.into());
    }

    let reindexer = state.services.reindexer.clone();
    let report = state.pool.run(move || reindexer.run(&handle)).await??;

    Ok(Json(ReindexResponse {
        message: if report.published {
            "Documents reindexed successfully"
        } else {
            "No documents were processed"
        },
        documents_attempted: report.documents_attempted,
        documents_processed: report.documents_indexed,
        documents_skipped: report.documents_skipped,
        failures: report.failures,
        total_chunks: report.total_chunks,
    }))
}

// ---------------------------------------------------------------------------
// GET /status/{filename}
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StatusResponse {
    filename: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

async fn document_status(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let corpus = state.services.corpus.clone();
    let name = filename.clone();
    let (exists, uri) = state
        .pool
        .run(move || -> Result<_, CorpusError> {
            let exists = corpus.exists(&name)?;
            let uri = if exists { Some(corpus.uri(&name)?) } else { None };
            Ok((exists, uri))
        })
        .await??;

    Ok(Json(StatusResponse {
        filename,
        exists,
        uri,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_client_paths() {
        assert_eq!(base_name("lease.pdf"), "lease.pdf");
        assert_eq!(base_name("C:\\Users\\me\\lease.pdf"), "lease.pdf");
        assert_eq!(base_name("../../etc/passwd"), "passwd");
        assert_eq!(base_name("dir/"), "");
    }

    #[test]
    fn test_error_status_mapping() {
        let unsupported: ApiError = IngestError::Extract(ExtractError::UnsupportedFormat {
            name: "a.doc".into(),
            supported: "pdf".into(),
        })
        .into();
        assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let duplicate: ApiError = IndexError::DuplicateDocument("a.txt".into()).into();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let busy: ApiError = ReindexError::InProgress.into();
        assert_eq!(busy.status(), StatusCode::CONFLICT);

        let empty: ApiError = RetrievalError::EmptyQuery.into();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = RetrievalError::DocumentNotFound("x".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let upstream: ApiError = GenerationError::EmptyResponse.into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }
}
