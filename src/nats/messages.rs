use serde::{Deserialize, Serialize};

/// Recognition command published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognitionControlMessage {
    pub session_id: String,
    pub action: ControlAction,
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
    pub timestamp: String, // RFC3339 timestamp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Start,
    Stop,
}

/// Transcript message received from STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Error reported by the STT service for a session
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognitionErrorMessage {
    pub session_id: String,
    /// Engine error code, e.g. "no-speech" or "network"
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    pub timestamp: String,
}
