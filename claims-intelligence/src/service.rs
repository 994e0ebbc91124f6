use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use claims_flow::{FlowRunner, GraphError, Session, SessionStorage};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditLogger, AuditRecord, summarize};
use crate::error::ClaimsError;
use crate::governance::GovernanceReport;
use crate::memory::SessionMemory;
use crate::models::{
    AuditLogResponse, ChatResponse, ClaimExplanation, ClaimQuestionRequest, EXPLANATION_DISCLAIMER,
    ExplainClaimRequest, ExplainClaimResponse, HistoryResponse, QuestionAnswer, QuoteChatRequest,
    QuoteChatTurn, ReviewDecisionRequest, ReviewDecisionResponse, UnderwritingAssessRequest,
    UnderwritingAssessResponse,
};
use crate::tasks::session_keys;
use crate::underwriting::UnderwritingResult;
use crate::workflow::{
    CLAIM_EXPLANATION_GRAPH, CLAIM_QA_GRAPH, QUOTE_CHAT_GRAPH, WorkflowDeps, Workflows,
    new_session_id,
};

/// Error body returned by every handler: `{"error": ...}` with a mapped status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(session_id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Session not found: {session_id}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn status_for(error: &ClaimsError) -> StatusCode {
    match error {
        ClaimsError::Input(_) => StatusCode::BAD_REQUEST,
        ClaimsError::Service(_) | ClaimsError::Parse(_) => StatusCode::BAD_GATEWAY,
        ClaimsError::Schema { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ClaimsError> for ApiError {
    fn from(error: ClaimsError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            error!(error = %error, "Request failed");
        }
        Self::new(status, error.to_string())
    }
}

impl From<GraphError> for ApiError {
    fn from(error: GraphError) -> Self {
        if let Some(claims_error) = ClaimsError::from_graph_error(&error) {
            let status = status_for(claims_error);
            if status.is_server_error() {
                error!(error = %claims_error, "Workflow step failed");
            }
            return Self::new(status, claims_error.to_string());
        }
        match error {
            GraphError::SessionNotFound(id) => Self::not_found(&id),
            other => {
                error!(error = %other, "Workflow engine error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub memory: SessionMemory,
    pub workflows: Workflows,
    pub audit: Arc<AuditLogger>,
}

impl AppState {
    pub fn new(deps: &WorkflowDeps, session_storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            memory: SessionMemory::new(session_storage.clone()),
            workflows: Workflows::new(deps, session_storage.clone()),
            audit: deps.audit.clone(),
            session_storage,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/claims/explain", post(explain_claim))
        .route("/claims/{session_id}/review", post(review_claim))
        .route("/claims/questions", post(ask_claim_question))
        .route("/quotes/chat", post(quote_chat))
        .route("/underwriting/assess", post(assess_underwriting))
        .route("/audit", get(audit_log))
        .route("/sessions/{session_id}/history", get(session_history))
        .route("/sessions/{session_id}", delete(close_session))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Tag each request with a correlation id header and tracing span.
async fn correlation_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }
    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Claims Intelligence Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /claims/explain": "Explain a claim decision and run governance checks",
            "POST /claims/{session_id}/review": "Record the reviewer decision for a pending explanation",
            "POST /claims/questions": "Ask a question about a claim report",
            "POST /quotes/chat": "Compare quotes and ask about the policy wording",
            "POST /underwriting/assess": "Produce an underwriting risk summary",
            "GET /audit": "Audit log with per-decision summary",
            "GET /sessions/{session_id}/history": "Conversation history of a session",
            "DELETE /sessions/{session_id}": "Close a session",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn explain_claim(
    State(state): State<AppState>,
    Json(request): Json<ExplainClaimRequest>,
) -> ApiResult<ExplainClaimResponse> {
    let runner = &state.workflows.claim_explanation;
    let session = start_session(&state, runner, new_session_id()).await?;
    let session_id = session.id.clone();
    info!(session_id = %session_id, claim_type = %request.claim_type, "Starting claim explanation");

    session.context.set(session_keys::CLAIM_SUBMISSION, request).await;
    save_session(&state, session).await?;

    let result = runner.run(&session_id).await?;
    info!(session_id = %session_id, status = ?result.status, "Claim explanation step finished");

    let session = load_session(&state, &session_id).await?;
    let explanation: ClaimExplanation = context_value(&session, session_keys::CLAIM_EXPLANATION).await?;
    let governance: GovernanceReport = context_value(&session, session_keys::GOVERNANCE).await?;
    let awaiting_review = session
        .context
        .get::<bool>(session_keys::AWAITING_REVIEW)
        .await
        .unwrap_or(false);

    Ok(Json(ExplainClaimResponse {
        session_id,
        decision: explanation.decision,
        explanation: explanation.explanation,
        disclaimer: EXPLANATION_DISCLAIMER.to_string(),
        governance,
        status: if awaiting_review { "awaiting_review" } else { "completed" }.to_string(),
        audit_record: session.context.get(session_keys::AUDIT_RECORD).await,
        audit_error: session.context.get(session_keys::AUDIT_ERROR).await,
    }))
}

async fn review_claim(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ReviewDecisionRequest>,
) -> ApiResult<ReviewDecisionResponse> {
    let session = load_session(&state, &session_id).await?;
    let awaiting = session
        .context
        .get::<bool>(session_keys::AWAITING_REVIEW)
        .await
        .unwrap_or(false);
    if session.graph_id != CLAIM_EXPLANATION_GRAPH || !awaiting {
        warn!(session_id = %session_id, "Review decision for a session that is not awaiting review");
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "Session is not awaiting a review decision",
        ));
    }

    info!(session_id = %session_id, flag_for_review = request.flag_for_review, "Recording review decision");
    session
        .context
        .set(session_keys::REVIEW_DECISION, request.flag_for_review)
        .await;
    save_session(&state, session).await?;

    state.workflows.claim_explanation.run(&session_id).await?;

    let session = load_session(&state, &session_id).await?;
    let audit_record: Option<AuditRecord> = session.context.get(session_keys::AUDIT_RECORD).await;
    let audit_error: Option<String> = session.context.get(session_keys::AUDIT_ERROR).await;
    if audit_record.is_none() && audit_error.is_none() {
        error!(session_id = %session_id, "Review finished without an audit outcome");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "workflow produced no audit_record",
        ));
    }
    Ok(Json(ReviewDecisionResponse {
        session_id,
        audit_record,
        audit_error,
    }))
}

async fn ask_claim_question(
    State(state): State<AppState>,
    Json(request): Json<ClaimQuestionRequest>,
) -> ApiResult<ChatResponse<QuestionAnswer>> {
    let runner = &state.workflows.claim_qa;
    let session = match request.session_id {
        Some(id) => existing_session(&state, &id, CLAIM_QA_GRAPH).await?,
        None => {
            let report = request
                .report_text
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| ClaimsError::input("report_text is required to open a session"))?;
            let session = start_session(&state, runner, new_session_id()).await?;
            session.context.set(session_keys::CLAIM_REPORT, report).await;
            session
        }
    };
    let session_id = session.id.clone();

    session.context.set(session_keys::USER_INPUT, request.question).await;
    save_session(&state, session).await?;

    let result = runner.run(&session_id).await?;
    Ok(Json(ChatResponse {
        session_id,
        turn: QuestionAnswer {
            answer: result.response.unwrap_or_default(),
        },
    }))
}

async fn quote_chat(
    State(state): State<AppState>,
    Json(request): Json<QuoteChatRequest>,
) -> ApiResult<ChatResponse<QuoteChatTurn>> {
    let runner = &state.workflows.quote_chat;
    let session = match request.session_id {
        Some(id) => {
            let session = existing_session(&state, &id, QUOTE_CHAT_GRAPH).await?;
            if let Some(quote_set) = request.quote_set {
                session.context.set(session_keys::QUOTE_SET, quote_set).await;
            }
            session
        }
        None => {
            let quote_set = request
                .quote_set
                .ok_or_else(|| ClaimsError::input("quote_set is required to open a session"))?;
            let session = start_session(&state, runner, new_session_id()).await?;
            session.context.set(session_keys::QUOTE_SET, quote_set).await;
            session
        }
    };
    let session_id = session.id.clone();

    session.context.set(session_keys::USER_INPUT, request.question).await;
    save_session(&state, session).await?;

    runner.run(&session_id).await?;

    let session = load_session(&state, &session_id).await?;
    let turn: QuoteChatTurn = context_value(&session, session_keys::QUOTE_CHAT_TURN).await?;
    Ok(Json(ChatResponse { session_id, turn }))
}

async fn assess_underwriting(
    State(state): State<AppState>,
    Json(request): Json<UnderwritingAssessRequest>,
) -> ApiResult<UnderwritingAssessResponse> {
    let runner = &state.workflows.underwriting;
    let session = start_session(&state, runner, new_session_id()).await?;
    let session_id = session.id.clone();

    session
        .context
        .set(session_keys::UNDERWRITING_REQUEST, request)
        .await;
    save_session(&state, session).await?;

    runner.run(&session_id).await?;

    let session = load_session(&state, &session_id).await?;
    let result: UnderwritingResult = context_value(&session, session_keys::UNDERWRITING_RESULT).await?;
    Ok(Json(UnderwritingAssessResponse { session_id, result }))
}

async fn audit_log(State(state): State<AppState>) -> ApiResult<AuditLogResponse> {
    let records = state.audit.read()?;
    let summary = summarize(&records);
    Ok(Json(AuditLogResponse { records, summary }))
}

async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<HistoryResponse> {
    let exchanges = state
        .memory
        .history(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(&session_id))?;
    Ok(Json(HistoryResponse {
        session_id,
        exchanges,
    }))
}

async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.memory.close(&session_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(&session_id))
    }
}

async fn start_session(state: &AppState, runner: &FlowRunner, session_id: String) -> Result<Session, ApiError> {
    let graph = runner.graph();
    let start_task = graph.start_task_id().ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("workflow {} has no start task", graph.id),
        )
    })?;
    let session = state.memory.open(&session_id, &graph.id, start_task).await?;
    session.context.set(session_keys::SESSION_ID, session_id).await;
    Ok(session)
}

async fn existing_session(state: &AppState, session_id: &str, graph_id: &str) -> Result<Session, ApiError> {
    let session = load_session(state, session_id).await?;
    if session.graph_id != graph_id {
        return Err(ClaimsError::input(format!(
            "session {session_id} belongs to the {} workflow",
            session.graph_id
        ))
        .into());
    }
    Ok(session)
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Session, ApiError> {
    state
        .session_storage
        .get(session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(session_id))
}

async fn save_session(state: &AppState, session: Session) -> Result<(), ApiError> {
    state.session_storage.save(session).await.map_err(|e| {
        error!(error = %e, "Failed to save session");
        ApiError::from(e)
    })
}

async fn context_value<T: DeserializeOwned>(session: &Session, key: &str) -> Result<T, ApiError> {
    session.context.get(key).await.ok_or_else(|| {
        error!(session_id = %session.id, key = %key, "Workflow finished without expected output");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("workflow produced no {key}"),
        )
    })
}
