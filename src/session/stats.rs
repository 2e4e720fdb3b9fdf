use super::state::{CaptureState, LifecycleState};
use crate::logging::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a session, as returned by `SessionHandle::status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session identifier (also used as the STT session id)
    pub session_id: String,

    /// Overall on/off status
    pub lifecycle: LifecycleState,

    /// Capture sub-state
    pub capture: CaptureState,

    /// Normalized wake word
    pub wake_word: String,

    /// Locale tag handed to the engine
    pub language: String,

    /// Current diagnostic level
    pub log_level: LogLevel,

    /// Consecutive restart attempts since the last transcript
    pub restart_attempts: u32,

    /// Whether a restart waits for the engine to end
    pub pending_restart: bool,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Running counters
    pub stats: SessionStats,
}

/// Counters accumulated over the life of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Transcript events received while listening
    pub transcripts: u64,

    /// Wake-word triggers
    pub wake_words: u64,

    /// Commands delivered
    pub commands: u64,

    /// Captures that ended without a command
    pub no_commands: u64,

    /// Engine restarts performed
    pub restarts: u64,

    /// Errors reported to the caller
    pub errors: u64,
}
