//! Route handler functions for all API endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use admit_chat::{ChatReply, ConversationTurn, Statistics};
use admit_core::ReplySource;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub topic: String,
    pub confidence: f32,
    pub source: ReplySource,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            topic: reply.topic_label().to_string(),
            response: reply.reply,
            confidence: reply.confidence,
            source: reply.source,
            session_id: reply.session_id,
            timestamp: reply.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub statistics: Statistics,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub reset: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "admissions-assistant".to_string(),
        timestamp: Utc::now(),
    })
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let query = body.query.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("'query' must not be empty".to_string()));
    }
    let max_chars = state.config.server.max_query_chars;
    if query.chars().count() > max_chars {
        return Err(ApiError::BadRequest(format!(
            "'query' must be at most {} characters",
            max_chars
        )));
    }

    let reply = state
        .composer
        .respond(query, body.session_id.as_deref())
        .await;
    debug!(session_id = %reply.session_id, path = ?reply.path, "Chat request served");

    Ok(Json(ChatResponse::from(reply)))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        statistics: state.composer.statistics(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_sessions: state.composer.active_sessions(),
    })
}

/// GET /api/sessions/{id}/history
pub async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let turns = state.composer.history(&id)?;
    Ok(Json(HistoryResponse {
        session_id: id,
        turns,
    }))
}

/// DELETE /api/sessions/{id}
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    state.composer.reset_session(&id)?;
    Ok(Json(ResetResponse {
        session_id: id,
        reset: true,
    }))
}
