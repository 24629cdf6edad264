use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/interviews/start", post(handlers::start_session))
        .route(
            "/interviews/:session_key/submit",
            post(handlers::submit_session),
        )
        .route(
            "/interviews/:session_key/abort",
            post(handlers::abort_session),
        )
        .route(
            "/interviews/:session_key/unload",
            post(handlers::unload_session),
        )
        // Conversation
        .route(
            "/interviews/:session_key/turns/text",
            post(handlers::send_text_turn),
        )
        .route(
            "/interviews/:session_key/turns/audio",
            post(handlers::send_audio_turn),
        )
        // Screen state
        .route(
            "/interviews/:session_key/status",
            get(handlers::session_status),
        )
        .route(
            "/interviews/:session_key/activity",
            post(handlers::activity),
        )
        .route(
            "/interviews/:session_key/notices",
            get(handlers::session_notices),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
