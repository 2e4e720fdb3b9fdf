use super::state::{AppState, CommandRecord};
use crate::error::WakeError;
use crate::logging::LogLevel;
use crate::session::SessionStatus;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WakeWordRequest {
    pub wake_word: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct LogLevelRequest {
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub message: String,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn wake_error_response(err: WakeError) -> Response {
    let status = match err {
        WakeError::MissingWakeWord => StatusCode::BAD_REQUEST,
        WakeError::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

/// Queue a control request, then report the status once it has been applied
async fn control(
    state: &AppState,
    action: &str,
    request: Result<(), WakeError>,
) -> Response {
    if let Err(e) = request {
        error!("Failed to {} session: {}", action, e);
        return wake_error_response(e);
    }

    match state.session.status().await {
        Ok(status) => {
            info!("Session {}: {}", action, status.lifecycle.description());
            (
                StatusCode::OK,
                Json(ControlResponse {
                    message: format!("{} requested", action),
                    status,
                }),
            )
                .into_response()
        }
        Err(e) => wake_error_response(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    if !state.session.is_supported() {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            WakeError::Unsupported.to_string(),
        );
    }
    let request = state.session.start();
    control(&state, "start", request).await
}

/// POST /session/stop
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let request = state.session.stop();
    control(&state, "stop", request).await
}

/// POST /session/pause
pub async fn pause_session(State(state): State<AppState>) -> impl IntoResponse {
    let request = state.session.pause();
    control(&state, "pause", request).await
}

/// POST /session/resume
pub async fn resume_session(State(state): State<AppState>) -> impl IntoResponse {
    let request = state.session.resume();
    control(&state, "resume", request).await
}

/// PUT /session/wake-word
pub async fn set_wake_word(
    State(state): State<AppState>,
    Json(req): Json<WakeWordRequest>,
) -> impl IntoResponse {
    let request = state.session.set_wake_word(&req.wake_word);
    control(&state, "wake word change", request).await
}

/// PUT /session/language
pub async fn set_language(
    State(state): State<AppState>,
    Json(req): Json<LanguageRequest>,
) -> impl IntoResponse {
    if req.language.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Language must not be empty");
    }
    let request = state.session.set_language(&req.language);
    control(&state, "language change", request).await
}

/// PUT /session/log-level
pub async fn set_log_level(
    State(state): State<AppState>,
    Json(req): Json<LogLevelRequest>,
) -> impl IntoResponse {
    let level = match req.level.parse::<LogLevel>() {
        Ok(level) => level,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    let request = state.session.set_log_level(level);
    control(&state, "log level change", request).await
}

/// GET /session/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => wake_error_response(e),
    }
}

/// GET /session/commands
/// Commands delivered so far, oldest first
pub async fn get_commands(State(state): State<AppState>) -> impl IntoResponse {
    let commands: Vec<CommandRecord> = state.commands.read().await.iter().cloned().collect();
    (StatusCode::OK, Json(commands))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
