//! Session states and inbound engine events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall on/off status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Not listening; only an explicit `start()` leaves this state
    #[default]
    Idle,
    /// Engine running, transcripts are being classified
    Listening,
    /// Engine stopped by `pause()`, capture state retained
    Paused,
    /// Engine stop in progress
    Stopping,
}

impl LifecycleState {
    pub fn description(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "Not listening",
            LifecycleState::Listening => "Listening",
            LifecycleState::Paused => "Paused",
            LifecycleState::Stopping => "Stopping",
        }
    }
}

/// Sub-state of command capture while listening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// Waiting for the wake word to appear in a transcript
    #[default]
    AwaitingWakeWord,
    /// Wake word heard, collecting the command
    AwaitingCommand,
    /// Command finalized; transient, resets to `AwaitingWakeWord`
    CaptureComplete,
}

/// Error codes reported by the recognition engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineErrorKind {
    /// No speech was heard; expected and noisy
    NoSpeech,
    /// Recognition was aborted, usually by our own stop
    Aborted,
    /// Microphone capture failed
    AudioCapture,
    /// Recognition service unreachable
    Network,
    /// Microphone permission denied
    NotAllowed,
    /// Recognition service refused the request
    ServiceNotAllowed,
    /// Configured locale is not available
    LanguageNotSupported,
    /// Any other engine-specific code
    Other(String),
}

impl EngineErrorKind {
    /// Map an engine error code (`"no-speech"`, `"network"`, ...) to a kind
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "no-speech" => EngineErrorKind::NoSpeech,
            "aborted" => EngineErrorKind::Aborted,
            "audio-capture" => EngineErrorKind::AudioCapture,
            "network" => EngineErrorKind::Network,
            "not-allowed" => EngineErrorKind::NotAllowed,
            "service-not-allowed" => EngineErrorKind::ServiceNotAllowed,
            "language-not-supported" => EngineErrorKind::LanguageNotSupported,
            other => EngineErrorKind::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            EngineErrorKind::NoSpeech => "no-speech",
            EngineErrorKind::Aborted => "aborted",
            EngineErrorKind::AudioCapture => "audio-capture",
            EngineErrorKind::Network => "network",
            EngineErrorKind::NotAllowed => "not-allowed",
            EngineErrorKind::ServiceNotAllowed => "service-not-allowed",
            EngineErrorKind::LanguageNotSupported => "language-not-supported",
            EngineErrorKind::Other(code) => code,
        }
    }

    /// Errors that retrying cannot fix
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineErrorKind::NotAllowed
                | EngineErrorKind::ServiceNotAllowed
                | EngineErrorKind::LanguageNotSupported
        )
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Notifications from the recognition engine, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Latest transcript hypothesis
    Result { transcript: String, is_final: bool },
    /// Engine reported an error
    Error(EngineErrorKind),
    /// Engine session ended (requested or not)
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_round_trip() {
        for code in [
            "no-speech",
            "aborted",
            "audio-capture",
            "network",
            "not-allowed",
            "service-not-allowed",
            "language-not-supported",
            "bad-grammar",
        ] {
            assert_eq!(EngineErrorKind::from_code(code).code(), code);
        }
    }

    #[test]
    fn only_permission_and_locale_errors_are_fatal() {
        assert!(EngineErrorKind::NotAllowed.is_fatal());
        assert!(EngineErrorKind::LanguageNotSupported.is_fatal());
        assert!(!EngineErrorKind::Network.is_fatal());
        assert!(!EngineErrorKind::NoSpeech.is_fatal());
    }

    #[test]
    fn states_serialize_snake_case() {
        let json = serde_json::to_string(&CaptureState::AwaitingCommand).unwrap();
        assert_eq!(json, "\"awaiting_command\"");
        let json = serde_json::to_string(&LifecycleState::Listening).unwrap();
        assert_eq!(json, "\"listening\"");
    }
}
