use crate::error::WakeError;
use crate::logging::LogLevel;
use std::fmt;
use std::time::Duration;

/// Configuration for a wake-word session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Unique session identifier (e.g., "wake-kitchen")
    pub session_id: String,

    /// Trigger phrase (e.g., "hey assistant"); required, matched case-insensitively
    pub wake_word: Option<String>,

    /// Locale tag handed to the recognition engine
    /// Default: "en-US"
    pub language: String,

    /// Silence window before a capture is finalized or abandoned
    /// Default: 3 seconds
    pub command_timeout: Duration,

    /// Diagnostic verbosity for this session
    pub log_level: LogLevel,

    /// Shortest command (in characters) that counts as usable
    pub min_command_length: usize,

    /// Cooldowns, watchdog and restart pacing
    pub timing: SessionTiming,
}

impl SessionOptions {
    pub fn new(wake_word: impl Into<String>) -> Self {
        Self {
            wake_word: Some(wake_word.into()),
            ..Self::default()
        }
    }

    /// Normalized wake word, or `MissingWakeWord` if absent or blank
    pub fn normalized_wake_word(&self) -> Result<String, WakeError> {
        normalize_wake_word(self.wake_word.as_deref().unwrap_or_default())
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_id: format!("wake-{}", uuid::Uuid::new_v4()),
            wake_word: None,
            language: "en-US".to_string(),
            command_timeout: Duration::from_millis(3000),
            log_level: LogLevel::Info,
            min_command_length: 1,
            timing: SessionTiming::default(),
        }
    }
}

/// Trim and lower-case a wake word, rejecting blank input
pub fn normalize_wake_word(text: &str) -> Result<String, WakeError> {
    let normalized = crate::extract::normalize(text);
    if normalized.is_empty() {
        return Err(WakeError::MissingWakeWord);
    }
    Ok(normalized)
}

/// Timing knobs for detection and recovery
#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Minimum gap between two wake-word triggers
    pub wake_word_cooldown: Duration,

    /// Restart the engine when nothing has been heard for this long
    pub inactivity_timeout: Duration,

    /// Delay before restarting after an unsolicited engine end
    pub end_restart_delay: Duration,

    /// First backoff delay; doubles on each further attempt
    pub restart_backoff_base: Duration,

    /// Restart attempts before the session gives up
    pub max_restart_attempts: u32,

    /// Repeated "no speech" errors inside this window are dropped
    pub no_speech_cooldown: Duration,

    /// How long after `stop()` a `start()` is deferred
    pub stop_debounce: Duration,

    /// Retry interval for a deferred `start()`
    pub start_retry_delay: Duration,

    /// Interval of the capture countdown ticker
    pub countdown_tick: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            wake_word_cooldown: Duration::from_millis(2000),
            inactivity_timeout: Duration::from_secs(30),
            end_restart_delay: Duration::from_millis(300),
            restart_backoff_base: Duration::from_millis(1000),
            max_restart_attempts: 5,
            no_speech_cooldown: Duration::from_millis(3000),
            stop_debounce: Duration::from_millis(250),
            start_retry_delay: Duration::from_millis(100),
            countdown_tick: Duration::from_secs(1),
        }
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;
type TextHook = Box<dyn Fn(&str) + Send + Sync>;

/// Application callbacks; every hook is optional
#[derive(Default)]
pub struct SessionCallbacks {
    wake_word_detected: Option<Hook>,
    transcription: Option<TextHook>,
    command: Option<TextHook>,
    command_timeout: Option<Hook>,
    error: Option<Box<dyn Fn(&WakeError) + Send + Sync>>,
    countdown: Option<Box<dyn Fn(u64) + Send + Sync>>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per wake-word trigger
    pub fn on_wake_word_detected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.wake_word_detected = Some(Box::new(f));
        self
    }

    /// Called with the growing command text while a capture is in flight
    pub fn on_transcription(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.transcription = Some(Box::new(f));
        self
    }

    /// Called with the final command text
    pub fn on_command(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.command = Some(Box::new(f));
        self
    }

    /// Called when a capture ends without a usable command
    pub fn on_command_timeout(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.command_timeout = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&WakeError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Called every countdown tick with the whole seconds left in the capture
    pub fn on_countdown(mut self, f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.countdown = Some(Box::new(f));
        self
    }

    pub(crate) fn wake_word_detected(&self) {
        if let Some(f) = &self.wake_word_detected {
            f();
        }
    }

    pub(crate) fn transcription(&self, text: &str) {
        if let Some(f) = &self.transcription {
            f(text);
        }
    }

    pub(crate) fn command(&self, text: &str) {
        if let Some(f) = &self.command {
            f(text);
        }
    }

    pub(crate) fn command_timeout(&self) {
        if let Some(f) = &self.command_timeout {
            f();
        }
    }

    pub(crate) fn error(&self, err: &WakeError) {
        if let Some(f) = &self.error {
            f(err);
        }
    }

    pub(crate) fn countdown(&self, remaining_secs: u64) {
        if let Some(f) = &self.countdown {
            f(remaining_secs);
        }
    }
}

impl fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("wake_word_detected", &self.wake_word_detected.is_some())
            .field("transcription", &self.transcription.is_some())
            .field("command", &self.command.is_some())
            .field("command_timeout", &self.command_timeout.is_some())
            .field("error", &self.error.is_some())
            .field("countdown", &self.countdown.is_some())
            .finish()
    }
}
