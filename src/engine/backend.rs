use crate::session::EngineEvents;
use anyhow::Result;

/// Settings applied to an engine before every start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Keep recognizing across pauses instead of stopping after one phrase
    pub continuous: bool,
    /// Deliver provisional hypotheses as well as final ones
    pub interim_results: bool,
    /// Locale tag (e.g., "en-US")
    pub language: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            language: "en-US".to_string(),
        }
    }
}

/// Continuous speech-recognition engine
///
/// Implementations translate their host's notifications into calls on the
/// [`EngineEvents`] sink handed to `start`:
/// - one `result` per transcript hypothesis
/// - `error` with the engine's error code
/// - `end` whenever recognition stops, requested or not
#[async_trait::async_trait]
pub trait RecognitionEngine: Send {
    /// Apply settings; takes effect on the next `start`
    fn configure(&mut self, settings: &EngineSettings);

    /// Begin recognizing, delivering events to `events`
    async fn start(&mut self, events: EngineEvents) -> Result<()>;

    /// Stop recognizing; the engine should still deliver `end`
    async fn stop(&mut self) -> Result<()>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Creates engines and reports whether the host can run one
pub trait EngineFactory: Send + Sync {
    /// Capability check; must not have side effects
    fn is_supported(&self) -> bool;

    fn create(&self) -> Result<Box<dyn RecognitionEngine>>;
}
