//! Error types for wake-command
//!
//! Only construction-time misuse is returned to the caller as a hard failure.
//! Everything else is delivered to the session's `on_error` callback as an
//! advisory while the session recovers on its own.

use crate::session::EngineErrorKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WakeError {
    #[error("A wake word is required and must not be blank")]
    MissingWakeWord,

    #[error("Speech recognition is not supported on this host")]
    Unsupported,

    #[error("Failed to create recognition engine: {0}")]
    EngineCreate(String),

    #[error("Failed to start recognition engine: {0}")]
    EngineStart(String),

    #[error("Recognition error: {0}")]
    Recognition(EngineErrorKind),

    #[error("Recognition stopped after {attempts} failed restart attempts; call start() to listen again")]
    RetriesExhausted { attempts: u32 },

    #[error("Session is no longer running")]
    SessionClosed,
}

impl WakeError {
    /// Whether this error ends the session instead of being retried
    pub fn is_terminal(&self) -> bool {
        match self {
            WakeError::RetriesExhausted { .. } | WakeError::Unsupported => true,
            WakeError::Recognition(kind) => kind.is_fatal(),
            _ => false,
        }
    }
}
