use super::config::{normalize_wake_word, SessionCallbacks, SessionOptions};
use super::detector::{Detector, DetectorAction, NoCommandReason};
use super::resilience::{ErrorDisposition, ErrorFilter, RestartBackoff};
use super::state::{EngineErrorKind, EngineEvent, LifecycleState};
use super::stats::{SessionStats, SessionStatus};
use super::timers::{TimerKind, Timers};
use crate::engine::{EngineFactory, EngineSettings, RecognitionEngine};
use crate::error::WakeError;
use crate::logging::{session_log, LogLevel};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Everything the session task reacts to, processed one at a time
pub(crate) enum Input {
    Engine { epoch: u64, event: EngineEvent },
    Timer { kind: TimerKind, generation: u64 },
    Control(Control),
}

pub(crate) enum Control {
    Start,
    Stop,
    Pause,
    Resume,
    SetWakeWord(String),
    SetLanguage(String),
    SetLogLevel(LogLevel),
    Status(oneshot::Sender<SessionStatus>),
}

/// Sink an engine adapter uses to deliver its notifications
///
/// Each engine start gets a sink bound to that run; events arriving through
/// the sink of an earlier run are dropped by the session. A sink does not keep
/// the session alive once every [`SessionHandle`] is gone.
#[derive(Clone)]
pub struct EngineEvents {
    tx: mpsc::WeakUnboundedSender<Input>,
    epoch: u64,
}

impl EngineEvents {
    /// Deliver an event; returns false once the session is gone
    pub fn emit(&self, event: EngineEvent) -> bool {
        let Some(tx) = self.tx.upgrade() else {
            return false;
        };
        tx.send(Input::Engine {
            epoch: self.epoch,
            event,
        })
        .is_ok()
    }

    pub fn result(&self, transcript: impl Into<String>, is_final: bool) -> bool {
        self.emit(EngineEvent::Result {
            transcript: transcript.into(),
            is_final,
        })
    }

    pub fn error(&self, kind: EngineErrorKind) -> bool {
        self.emit(EngineEvent::Error(kind))
    }

    pub fn end(&self) -> bool {
        self.emit(EngineEvent::End)
    }
}

impl fmt::Debug for EngineEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineEvents").field("epoch", &self.epoch).finish()
    }
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Input>,
    factory: Arc<dyn EngineFactory>,
    session_id: String,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Start listening; failures are reported through `on_error`
    pub fn start(&self) -> Result<(), WakeError> {
        self.send(Control::Start)
    }

    /// Stop listening and cancel every pending timer
    pub fn stop(&self) -> Result<(), WakeError> {
        self.send(Control::Stop)
    }

    /// Stop the engine but keep the capture in flight
    pub fn pause(&self) -> Result<(), WakeError> {
        self.send(Control::Pause)
    }

    pub fn resume(&self) -> Result<(), WakeError> {
        self.send(Control::Resume)
    }

    /// Replace the wake word; a capture in flight is discarded
    pub fn set_wake_word(&self, text: &str) -> Result<(), WakeError> {
        let wake_word = normalize_wake_word(text)?;
        self.send(Control::SetWakeWord(wake_word))
    }

    pub fn set_language(&self, tag: &str) -> Result<(), WakeError> {
        self.send(Control::SetLanguage(tag.trim().to_string()))
    }

    pub fn set_log_level(&self, level: LogLevel) -> Result<(), WakeError> {
        self.send(Control::SetLogLevel(level))
    }

    /// Whether the host can run a recognition engine at all
    pub fn is_supported(&self) -> bool {
        self.factory.is_supported()
    }

    /// Snapshot of the session once every earlier request has been processed
    pub async fn status(&self) -> Result<SessionStatus, WakeError> {
        let (reply, rx) = oneshot::channel();
        self.send(Control::Status(reply))?;
        rx.await.map_err(|_| WakeError::SessionClosed)
    }

    fn send(&self, control: Control) -> Result<(), WakeError> {
        self.tx
            .send(Input::Control(control))
            .map_err(|_| WakeError::SessionClosed)
    }
}

/// Create a session and spawn its task on the current tokio runtime
///
/// Fails with [`WakeError::MissingWakeWord`] if no usable wake word is given.
/// The session starts idle; call [`SessionHandle::start`] to listen. Once the
/// last handle is dropped the task stops the engine and exits.
pub fn create(
    options: SessionOptions,
    callbacks: SessionCallbacks,
    factory: Arc<dyn EngineFactory>,
) -> Result<SessionHandle, WakeError> {
    let wake_word = options.normalized_wake_word()?;
    let (tx, rx) = mpsc::unbounded_channel();

    let session_id = options.session_id.clone();

    let session = WakeSession::new(options, wake_word, callbacks, Arc::clone(&factory), tx.downgrade());
    tokio::spawn(session.run(rx));

    Ok(SessionHandle {
        tx,
        factory,
        session_id,
    })
}

/// State owned by the session task
struct WakeSession {
    options: SessionOptions,
    callbacks: SessionCallbacks,
    factory: Arc<dyn EngineFactory>,
    engine: Option<Box<dyn RecognitionEngine>>,
    /// Set by a successful engine start, cleared by a stop or an end
    engine_running: bool,
    tx: mpsc::WeakUnboundedSender<Input>,
    lifecycle: LifecycleState,
    detector: Detector,
    backoff: RestartBackoff,
    errors: ErrorFilter,
    timers: Timers,
    /// Incremented on every engine start
    epoch: u64,
    pending_restart: bool,
    /// Raised by `stop()`, cleared after the debounce window
    stop_guard: bool,
    command_deadline: Option<Instant>,
    created_at: chrono::DateTime<Utc>,
    stats: SessionStats,
}

impl WakeSession {
    fn new(
        options: SessionOptions,
        wake_word: String,
        callbacks: SessionCallbacks,
        factory: Arc<dyn EngineFactory>,
        tx: mpsc::WeakUnboundedSender<Input>,
    ) -> Self {
        let timing = &options.timing;
        let detector = Detector::new(wake_word, timing.wake_word_cooldown, options.min_command_length);
        let backoff = RestartBackoff::new(timing.restart_backoff_base, timing.max_restart_attempts);
        let errors = ErrorFilter::new(timing.no_speech_cooldown);

        Self {
            detector,
            backoff,
            errors,
            timers: Timers::new(tx.clone()),
            options,
            callbacks,
            factory,
            engine: None,
            engine_running: false,
            tx,
            lifecycle: LifecycleState::Idle,
            epoch: 0,
            pending_restart: false,
            stop_guard: false,
            command_deadline: None,
            created_at: Utc::now(),
            stats: SessionStats::default(),
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        session_log!(
            self.options.log_level,
            info,
            "Session {} created (wake word '{}', language {})",
            self.options.session_id,
            self.detector.wake_word(),
            self.options.language
        );

        while let Some(input) = rx.recv().await {
            match input {
                Input::Control(control) => self.handle_control(control).await,
                Input::Engine { epoch, event } => {
                    if epoch != self.epoch {
                        session_log!(self.options.log_level, trace, "Dropping event from engine run {}: {:?}", epoch, event);
                        continue;
                    }
                    self.handle_engine_event(event).await;
                }
                Input::Timer { kind, generation } => {
                    if self.timers.take_fired(kind, generation) {
                        self.handle_timer(kind).await;
                    }
                }
            }
        }

        // Every handle is gone
        self.timers.cancel_all();
        if self.engine_running {
            self.stop_engine().await;
        }
        session_log!(self.options.log_level, info, "Session {} closed", self.options.session_id);
    }

    // ------------------------------------------------------------------
    // Session controller
    // ------------------------------------------------------------------

    async fn handle_control(&mut self, control: Control) {
        match control {
            Control::Start => self.start().await,
            Control::Stop => self.stop().await,
            Control::Pause => self.pause().await,
            Control::Resume => self.resume().await,
            Control::SetWakeWord(wake_word) => self.set_wake_word(wake_word).await,
            Control::SetLanguage(language) => self.set_language(language).await,
            Control::SetLogLevel(level) => {
                self.options.log_level = level;
                session_log!(level, info, "Log level set to {}", level);
            }
            Control::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn start(&mut self) {
        if self.stop_guard {
            session_log!(self.options.log_level, debug, "Stop still settling, deferring start");
            self.timers.arm(TimerKind::StartRetry, self.options.timing.start_retry_delay);
            return;
        }

        if self.lifecycle == LifecycleState::Listening {
            session_log!(self.options.log_level, debug, "Already listening");
            return;
        }

        // Check host support before touching the engine
        if !self.factory.is_supported() {
            session_log!(self.options.log_level, error, "Speech recognition is not supported on this host");
            self.report(&WakeError::Unsupported);
            return;
        }

        // Reset transient state from any earlier run
        self.timers.cancel_all();
        self.detector.reset_capture();
        self.command_deadline = None;
        self.backoff.reset();
        self.pending_restart = false;

        match self.begin_listening().await {
            Ok(()) => {
                session_log!(
                    self.options.log_level,
                    info,
                    "Listening for '{}' ({})",
                    self.detector.wake_word(),
                    self.options.language
                );
            }
            Err(e) => {
                session_log!(self.options.log_level, error, "{}", e);
                self.report(&e);
            }
        }
    }

    /// Acquire, configure and start the engine, then mark the session listening
    async fn begin_listening(&mut self) -> Result<(), WakeError> {
        // Create the engine on first use
        if self.engine.is_none() {
            let engine = self
                .factory
                .create()
                .map_err(|e| WakeError::EngineCreate(format!("{:#}", e)))?;
            session_log!(self.options.log_level, debug, "Created {} recognition engine", engine.name());
            self.engine = Some(engine);
        }

        let Some(engine) = self.engine.as_mut() else {
            return Err(WakeError::EngineCreate("no engine available".to_string()));
        };

        // Continuous recognition with interim results
        engine.configure(&EngineSettings {
            continuous: true,
            interim_results: true,
            language: self.options.language.clone(),
        });

        // New run; events from the previous one become stale
        self.epoch += 1;
        let events = EngineEvents {
            tx: self.tx.clone(),
            epoch: self.epoch,
        };

        engine
            .start(events)
            .await
            .map_err(|e| WakeError::EngineStart(format!("{:#}", e)))?;

        // Mark as listening
        self.engine_running = true;
        self.lifecycle = LifecycleState::Listening;
        self.timers
            .arm(TimerKind::Inactivity, self.options.timing.inactivity_timeout);

        Ok(())
    }

    async fn stop(&mut self) {
        self.lifecycle = LifecycleState::Stopping;

        // Cancel timers and drop the capture in flight
        self.timers.cancel_all();
        self.pending_restart = false;
        self.detector.reset_capture();
        self.command_deadline = None;

        if self.engine_running {
            self.stop_engine().await;
        }

        // Hold off a new start until the engine has settled
        self.lifecycle = LifecycleState::Idle;
        self.stop_guard = true;
        self.timers
            .arm(TimerKind::StopDebounce, self.options.timing.stop_debounce);

        session_log!(self.options.log_level, info, "Stopped listening");
    }

    async fn pause(&mut self) {
        if self.lifecycle != LifecycleState::Listening {
            session_log!(self.options.log_level, debug, "Pause ignored while {:?}", self.lifecycle);
            return;
        }

        self.lifecycle = LifecycleState::Paused;
        self.pending_restart = false;
        self.timers.cancel(TimerKind::Inactivity);
        self.timers.cancel(TimerKind::Restart);
        self.cancel_capture_timers();
        self.stop_engine().await;

        session_log!(self.options.log_level, info, "Paused");
    }

    async fn resume(&mut self) {
        if self.lifecycle != LifecycleState::Paused {
            session_log!(self.options.log_level, debug, "Resume ignored while {:?}", self.lifecycle);
            return;
        }

        match self.begin_listening().await {
            Ok(()) => {
                if self.detector.is_capturing() {
                    self.arm_capture_timers();
                }
                session_log!(self.options.log_level, info, "Resumed");
            }
            Err(e) => {
                session_log!(self.options.log_level, error, "Resume failed: {}", e);
                self.report(&e);
            }
        }
    }

    async fn set_wake_word(&mut self, wake_word: String) {
        session_log!(self.options.log_level, info, "Wake word changed to '{}'", wake_word);

        self.detector.set_wake_word(wake_word);
        self.cancel_capture_timers();

        if self.lifecycle == LifecycleState::Listening {
            self.request_restart().await;
        }
    }

    async fn set_language(&mut self, language: String) {
        session_log!(self.options.log_level, info, "Language changed to {}", language);

        self.options.language = language;

        if self.engine.is_some() && self.lifecycle == LifecycleState::Listening {
            self.request_restart().await;
        }
    }

    /// Stop the engine and start it again once it reports its end
    async fn request_restart(&mut self) {
        if !self.engine_running {
            // No end will arrive; an armed restart picks up the change
            if !self.timers.is_armed(TimerKind::Restart) {
                self.restart_engine().await;
            }
            return;
        }

        self.pending_restart = true;
        self.timers.cancel(TimerKind::Restart);
        self.stop_engine().await;
    }

    async fn stop_engine(&mut self) {
        self.engine_running = false;
        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.stop().await {
                session_log!(self.options.log_level, warn, "Engine stop failed: {:#}", e);
            }
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.options.session_id.clone(),
            lifecycle: self.lifecycle,
            capture: self.detector.capture_state(),
            wake_word: self.detector.wake_word().to_string(),
            language: self.options.language.clone(),
            log_level: self.options.log_level,
            restart_attempts: self.backoff.attempts(),
            pending_restart: self.pending_restart,
            created_at: self.created_at,
            stats: self.stats.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Detector plumbing
    // ------------------------------------------------------------------

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Result {
                transcript,
                is_final,
            } => self.handle_transcript(&transcript, is_final),
            EngineEvent::Error(kind) => self.handle_engine_error(kind).await,
            EngineEvent::End => self.handle_engine_end().await,
        }
    }

    fn handle_transcript(&mut self, transcript: &str, is_final: bool) {
        if self.lifecycle != LifecycleState::Listening {
            session_log!(self.options.log_level, trace, "Transcript ignored while {:?}", self.lifecycle);
            return;
        }

        self.stats.transcripts += 1;
        self.backoff.reset();
        self.timers
            .arm(TimerKind::Inactivity, self.options.timing.inactivity_timeout);

        session_log!(
            self.options.log_level,
            debug,
            "Transcript ({}): {}",
            if is_final { "final" } else { "interim" },
            transcript
        );

        let actions = self.detector.on_transcript(transcript, is_final, Instant::now());
        self.apply(actions);
    }

    fn apply(&mut self, actions: Vec<DetectorAction>) {
        for action in actions {
            match action {
                DetectorAction::WakeWordDetected => {
                    session_log!(self.options.log_level, info, "Wake word '{}' detected", self.detector.wake_word());
                    self.stats.wake_words += 1;
                    self.callbacks.wake_word_detected();
                }
                DetectorAction::ArmCommandTimeout => self.arm_capture_timers(),
                DetectorAction::Progress(text) => {
                    session_log!(self.options.log_level, debug, "Command so far: {}", text);
                    self.callbacks.transcription(&text);
                }
                DetectorAction::Command(text) => {
                    self.cancel_capture_timers();
                    session_log!(self.options.log_level, info, "Command: {}", text);
                    self.stats.commands += 1;
                    self.callbacks.command(&text);
                }
                DetectorAction::NoCommand(reason) => {
                    self.cancel_capture_timers();
                    match reason {
                        NoCommandReason::Timeout => {
                            session_log!(self.options.log_level, info, "No command before timeout, returning to listening")
                        }
                        NoCommandReason::Unusable => {
                            session_log!(self.options.log_level, info, "No usable command, returning to listening")
                        }
                    }
                    self.stats.no_commands += 1;
                    self.callbacks.command_timeout();
                }
            }
        }
    }

    fn arm_capture_timers(&mut self) {
        let timeout = self.options.command_timeout;
        self.command_deadline = Some(Instant::now() + timeout);
        self.timers.arm(TimerKind::CommandTimeout, timeout);
        self.timers
            .arm(TimerKind::Countdown, self.options.timing.countdown_tick.min(timeout));
    }

    fn cancel_capture_timers(&mut self) {
        self.timers.cancel(TimerKind::CommandTimeout);
        self.timers.cancel(TimerKind::Countdown);
        self.command_deadline = None;
    }

    fn tick_countdown(&mut self) {
        let Some(deadline) = self.command_deadline else {
            return;
        };
        if !self.detector.is_capturing() {
            return;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let secs = remaining.as_millis().div_ceil(1000) as u64;
        self.callbacks.countdown(secs);

        if !remaining.is_zero() {
            let tick = self.options.timing.countdown_tick.min(remaining);
            self.timers.arm(TimerKind::Countdown, tick);
        }
    }

    // ------------------------------------------------------------------
    // Resilience
    // ------------------------------------------------------------------

    async fn handle_engine_error(&mut self, kind: EngineErrorKind) {
        if self.lifecycle != LifecycleState::Listening {
            session_log!(self.options.log_level, debug, "Engine error '{}' ignored while {:?}", kind, self.lifecycle);
            return;
        }

        match self.errors.classify(&kind, Instant::now()) {
            ErrorDisposition::Ignore => {
                session_log!(self.options.log_level, trace, "Engine error '{}' suppressed", kind);
            }
            ErrorDisposition::Report => {
                session_log!(self.options.log_level, warn, "Engine reported '{}'", kind);
                self.report(&WakeError::Recognition(kind));
            }
            ErrorDisposition::Recover => {
                session_log!(self.options.log_level, warn, "Engine error '{}', scheduling restart", kind);
                self.report(&WakeError::Recognition(kind));
                self.schedule_recovery().await;
            }
            ErrorDisposition::Fatal => {
                session_log!(self.options.log_level, error, "Engine error '{}' cannot be recovered, stopping", kind);
                self.report(&WakeError::Recognition(kind));
                self.stop().await;
            }
        }
    }

    async fn handle_engine_end(&mut self) {
        self.engine_running = false;

        if self.lifecycle != LifecycleState::Listening {
            session_log!(self.options.log_level, debug, "Engine ended while {:?}", self.lifecycle);
            return;
        }

        if self.pending_restart {
            self.pending_restart = false;
            session_log!(self.options.log_level, debug, "Engine ended, running deferred restart");
            self.stats.restarts += 1;
            if let Err(e) = self.begin_listening().await {
                session_log!(self.options.log_level, warn, "Deferred restart failed: {}", e);
                self.report(&e);
                self.schedule_recovery().await;
            }
            return;
        }

        if self.timers.is_armed(TimerKind::Restart) {
            session_log!(self.options.log_level, debug, "Engine ended, backoff restart already scheduled");
            return;
        }

        let delay = self.options.timing.end_restart_delay;
        session_log!(self.options.log_level, debug, "Engine ended unexpectedly, restarting in {:?}", delay);
        self.timers.arm(TimerKind::Restart, delay);
    }

    /// Schedule a restart with backoff, or stop once attempts are exhausted
    async fn schedule_recovery(&mut self) {
        match self.backoff.next_delay() {
            Some(delay) => {
                session_log!(
                    self.options.log_level,
                    info,
                    "Restarting recognition in {:?} (attempt {}/{})",
                    delay,
                    self.backoff.attempts(),
                    self.backoff.max_attempts()
                );
                self.timers.arm(TimerKind::Restart, delay);
            }
            None => {
                let err = WakeError::RetriesExhausted {
                    attempts: self.backoff.max_attempts(),
                };
                session_log!(self.options.log_level, error, "{}", err);
                self.report(&err);
                self.stop().await;
            }
        }
    }

    async fn restart_engine(&mut self) {
        self.stop_engine().await;
        self.stats.restarts += 1;

        if let Err(e) = self.begin_listening().await {
            session_log!(self.options.log_level, warn, "Restart failed: {}", e);
            self.report(&e);
            self.schedule_recovery().await;
        }
    }

    async fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::CommandTimeout => {
                let actions = self.detector.on_command_timeout();
                self.apply(actions);
            }
            TimerKind::Countdown => self.tick_countdown(),
            TimerKind::Inactivity => {
                if self.lifecycle == LifecycleState::Listening {
                    session_log!(
                        self.options.log_level,
                        warn,
                        "No recognition activity for {:?}, restarting engine",
                        self.options.timing.inactivity_timeout
                    );
                    self.pending_restart = false;
                    self.timers.cancel(TimerKind::Restart);
                    self.restart_engine().await;
                }
            }
            TimerKind::Restart => {
                if self.lifecycle == LifecycleState::Listening {
                    self.restart_engine().await;
                }
            }
            TimerKind::StartRetry => self.start().await,
            TimerKind::StopDebounce => self.stop_guard = false,
        }
    }

    fn report(&mut self, err: &WakeError) {
        self.stats.errors += 1;
        self.callbacks.error(err);
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .finish()
    }
}
