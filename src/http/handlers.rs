use super::state::{AppState, LiveSession};
use crate::error::TurnError;
use crate::session::{InterviewSession, Notice, SessionSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Interview type (e.g. "behavioral", "technical")
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_key: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TextTurnRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioTurnRequest {
    /// Base64-encoded audio bytes
    pub audio: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub record_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interviews/start
/// Enter a mock interview: spawns the session actor and begins setup
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let kind = req.kind.unwrap_or_else(|| "behavioral".to_string());
    let session_key = format!("session-{}", uuid::Uuid::new_v4());

    info!(session_key, kind, "Starting interview session");

    let (handle, notices) = InterviewSession::spawn(
        kind,
        Arc::clone(&state.api),
        Arc::clone(&state.capture),
        Arc::clone(&state.players),
        state.session_settings.clone(),
        state.stream_settings.clone(),
    );

    if let Err(e) = handle.begin().await {
        error!("Failed to begin interview session: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to begin session: {}", e),
            }),
        )
            .into_response();
    }

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(
            session_key.clone(),
            Arc::new(LiveSession {
                handle,
                notices: Mutex::new(notices),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_key,
            status: "initializing".to_string(),
        }),
    )
        .into_response()
}

/// GET /interviews/:session_key/status
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_key).await else {
        return not_found(&session_key);
    };

    match session.handle.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json::<SessionSnapshot>(snapshot)).into_response(),
        Err(e) => (
            StatusCode::GONE,
            Json(ErrorResponse {
                error: format!("Session is closed: {}", e),
            }),
        )
            .into_response(),
    }
}

/// POST /interviews/:session_key/turns/text
pub async fn send_text_turn(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
    Json(req): Json<TextTurnRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_key).await else {
        return not_found(&session_key);
    };

    turn_response(session.handle.send_text(&req.text).await)
}

/// POST /interviews/:session_key/turns/audio
pub async fn send_audio_turn(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
    Json(req): Json<AudioTurnRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_key).await else {
        return not_found(&session_key);
    };

    let audio = match base64::engine::general_purpose::STANDARD.decode(&req.audio) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid audio payload: {}", e),
                }),
            )
                .into_response();
        }
    };

    turn_response(session.handle.send_audio(audio, &req.mime_type).await)
}

/// POST /interviews/:session_key/activity
/// User interaction ping; resets the inactivity clock
pub async fn activity(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_key).await else {
        return not_found(&session_key);
    };

    session.handle.activity();
    StatusCode::NO_CONTENT.into_response()
}

/// POST /interviews/:session_key/submit
/// Submit and end; responds with the record id to review
pub async fn submit_session(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> impl IntoResponse {
    let Some(session) = remove(&state, &session_key).await else {
        return not_found(&session_key);
    };

    match session.handle.submit().await {
        Ok(record_id) => {
            info!(session_key, ?record_id, "Interview submitted");
            (StatusCode::OK, Json(SubmitResponse { record_id })).into_response()
        }
        Err(e) => {
            error!("Failed to submit interview: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to submit interview: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /interviews/:session_key/abort
/// Exit without submitting; nothing is persisted
pub async fn abort_session(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> impl IntoResponse {
    let Some(session) = remove(&state, &session_key).await else {
        return not_found(&session_key);
    };

    if let Err(e) = session.handle.abort().await {
        error!("Failed to abort interview: {}", e);
    }

    info!(session_key, "Interview aborted");
    StatusCode::NO_CONTENT.into_response()
}

/// POST /interviews/:session_key/unload
/// Beacon fired on page unload; must not block
pub async fn unload_session(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> impl IntoResponse {
    if let Some(session) = lookup(&state, &session_key).await {
        session.handle.unload();
    }

    // Accepted regardless; this is a best-effort safety net.
    StatusCode::ACCEPTED.into_response()
}

/// GET /interviews/:session_key/notices
/// Drain pending transient notices for display
pub async fn session_notices(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_key).await else {
        return not_found(&session_key);
    };

    let mut pending: Vec<Notice> = Vec::new();
    {
        let mut notices = session.notices.lock().await;
        while let Ok(notice) = notices.try_recv() {
            pending.push(notice);
        }
    }

    (StatusCode::OK, Json(pending)).into_response()
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Helpers
// ============================================================================

async fn lookup(state: &AppState, session_key: &str) -> Option<Arc<LiveSession>> {
    let sessions = state.sessions.read().await;
    sessions.get(session_key).cloned()
}

async fn remove(state: &AppState, session_key: &str) -> Option<Arc<LiveSession>> {
    let mut sessions = state.sessions.write().await;
    sessions.remove(session_key)
}

fn not_found(session_key: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {} not found", session_key),
        }),
    )
        .into_response()
}

fn turn_response(result: Result<crate::remote::TurnAck, TurnError>) -> axum::response::Response {
    match result {
        Ok(ack) => (
            StatusCode::OK,
            Json(TurnResponse {
                ok: ack.ok,
                message: ack.message,
            }),
        )
            .into_response(),
        Err(e) => {
            let status = match e {
                TurnError::MissingSession | TurnError::EmptyText => StatusCode::BAD_REQUEST,
                TurnError::Busy => StatusCode::CONFLICT,
                TurnError::Remote(_) => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
