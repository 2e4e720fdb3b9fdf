//! Wake-word session management
//!
//! This module provides the session that turns recognition results into
//! application signals:
//! - Session control (start/stop/pause/resume, wake word and language changes)
//! - Wake-word detection with cooldown and command capture
//! - Engine recovery (restart on end, backoff on errors, inactivity watchdog)
//! - Named timers, each cancelled when superseded
//!
//! All of a session's state lives on one tokio task; handles talk to it
//! through a queue, so transitions never run concurrently.

mod config;
mod detector;
mod resilience;
mod session;
mod state;
mod stats;
mod timers;

pub use config::{normalize_wake_word, SessionCallbacks, SessionOptions, SessionTiming};
pub use detector::{Detector, DetectorAction, NoCommandReason};
pub use resilience::{ErrorDisposition, ErrorFilter, RestartBackoff};
pub use session::{create, EngineEvents, SessionHandle};
pub use state::{CaptureState, EngineErrorKind, EngineEvent, LifecycleState};
pub use stats::{SessionStats, SessionStatus};
