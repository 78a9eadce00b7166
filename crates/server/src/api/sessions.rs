//! # Sessions API
//!
//! Create conversations, post turns, read the current specification and
//! stream turn events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use masforge_core::graph::TopologyGraph;
use masforge_core::session::{ChatMessage, SessionContext, TurnPhase, TurnResult};
use masforge_core::state::{SpecChange, SpecDocument, SpecIssue};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use utoipa::ToSchema;

use super::{ApiError, ApiResponse, SessionHandle, SharedState};

const HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize, ToSchema)]
pub struct MessageRequest {
    pub message: String,
}

/// Outcome of one turn
#[derive(Debug, Serialize, ToSchema)]
pub struct TurnResponse {
    pub reply: String,
    #[schema(value_type = String)]
    pub phase: TurnPhase,
    #[schema(value_type = Object)]
    pub specification: SpecDocument,
    #[schema(value_type = Object)]
    pub graph: TopologyGraph,
    pub mermaid: String,
    pub summary: String,
    #[schema(value_type = Vec<Object>)]
    pub issues: Vec<SpecIssue>,
    #[schema(value_type = Vec<Object>)]
    pub changes: Vec<SpecChange>,
    pub extraction_failed: bool,
    pub discarded_fields: Vec<String>,
}

impl From<TurnResult> for TurnResponse {
    fn from(turn: TurnResult) -> Self {
        Self {
            mermaid: turn.graph.to_mermaid(),
            reply: turn.reply,
            phase: turn.phase,
            specification: turn.specification,
            graph: turn.graph,
            summary: turn.summary,
            issues: turn.issues,
            changes: turn.changes,
            extraction_failed: turn.extraction_failed,
            discarded_fields: turn.discarded_fields,
        }
    }
}

/// Full view of a session
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub id: String,
    #[schema(value_type = String)]
    pub phase: TurnPhase,
    pub turns: u64,
    #[schema(value_type = Object)]
    pub specification: SpecDocument,
    #[schema(value_type = Object)]
    pub graph: TopologyGraph,
    pub mermaid: String,
    pub summary: String,
    #[schema(value_type = Vec<Object>)]
    pub issues: Vec<SpecIssue>,
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<ChatMessage>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&SessionContext> for SessionView {
    fn from(ctx: &SessionContext) -> Self {
        Self {
            id: ctx.id.clone(),
            phase: ctx.phase,
            turns: ctx.turns,
            specification: ctx.specification.clone(),
            graph: ctx.graph.clone(),
            mermaid: ctx.graph.to_mermaid(),
            summary: ctx.summary(),
            issues: ctx.issues(),
            history: ctx.history.clone(),
            created_at: ctx.created_at.to_rfc3339(),
            updated_at: ctx.updated_at.to_rfc3339(),
        }
    }
}

/// Listing entry as of the last committed turn
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionListItem {
    pub id: String,
    #[schema(value_type = String)]
    pub phase: TurnPhase,
    pub turns: u64,
    pub agents: usize,
    pub updated_at: String,
    /// A turn is in flight
    pub busy: bool,
}

impl From<&SessionContext> for SessionListItem {
    fn from(ctx: &SessionContext) -> Self {
        Self {
            id: ctx.id.clone(),
            phase: ctx.phase,
            turns: ctx.turns,
            agents: ctx.specification.agents.len(),
            updated_at: ctx.updated_at.to_rfc3339(),
            busy: false,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionListItem>,
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_session).get(list_sessions))
        .route("/:id", get(get_session).delete(delete_session))
        .route("/:id/messages", post(post_message))
        .route("/:id/events", get(session_events))
}

/// Start a new conversation with an empty specification
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "sessions",
    responses(
        (status = 201, description = "Session created", body = SessionView)
    )
)]
pub async fn create_session(State(state): State<SharedState>) -> (StatusCode, Json<SessionView>) {
    let ctx = SessionContext::new();
    let view = SessionView::from(&ctx);
    tracing::info!(session = %ctx.id, "Session created");
    state
        .sessions
        .write()
        .await
        .insert(ctx.id.clone(), Arc::new(SessionHandle::new(ctx)));
    (StatusCode::CREATED, Json(view))
}

/// List sessions held in memory; never waits for a running turn
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Active sessions", body = SessionsResponse)
    )
)]
pub async fn list_sessions(State(state): State<SharedState>) -> Json<SessionsResponse> {
    let handles: Vec<_> = state.sessions.read().await.values().cloned().collect();
    let mut sessions = Vec::with_capacity(handles.len());
    for handle in handles {
        let mut item = handle.listing.read().await.clone();
        item.busy = handle.context.try_lock().is_err();
        sessions.push(item);
    }
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Json(SessionsResponse { sessions })
}

/// Current specification, graph, summary and history
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session state", body = SessionView),
        (status = 404, description = "Unknown session", body = ApiResponse)
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state.session(&id).await?;
    let ctx = handle.context.lock().await;
    Ok(Json(SessionView::from(&*ctx)))
}

/// Discard a session
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = ApiResponse),
        (status = 404, description = "Unknown session", body = ApiResponse)
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            tracing::info!(session = %id, "Session deleted");
            Ok(Json(ApiResponse {
                success: true,
                message: format!("Session {} deleted", id),
            }))
        }
        None => Err(ApiError::not_found(format!("Session not found: {}", id))),
    }
}

/// Process one user message
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    request_body = MessageRequest,
    responses(
        (status = 200, description = "Turn processed", body = TurnResponse),
        (status = 404, description = "Unknown session", body = ApiResponse)
    )
)]
pub async fn post_message(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let handle = state.session(&id).await?;
    let orchestrator = state.orchestrator().await;

    let mut ctx = handle.context.lock().await;
    let turn = orchestrator.process_turn(&mut ctx, &req.message).await;
    *handle.listing.write().await = SessionListItem::from(&*ctx);
    Ok(Json(TurnResponse::from(turn)))
}

/// Server-sent turn events for one session, with a heartbeat comment
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/events",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Event stream (text/event-stream)"),
        (status = 404, description = "Unknown session", body = ApiResponse)
    )
)]
pub async fn session_events(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    state.session(&id).await?;
    let rx = state.event_tx.subscribe();

    let stream = stream::unfold((rx, id), |(mut rx, id)| async move {
        loop {
            match tokio::time::timeout(HEARTBEAT, rx.recv()).await {
                Ok(Ok(event)) if event.session_id == id => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    return Some((Ok(Event::default().data(json)), (rx, id)));
                }
                Ok(Ok(_)) => continue,
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::warn!(session = %id, skipped, "Event subscriber lagged");
                    continue;
                }
                Ok(Err(RecvError::Closed)) => return None,
                Err(_) => return Some((Ok(Event::default().comment("heartbeat")), (rx, id))),
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
