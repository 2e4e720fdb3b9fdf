//! Scripted recognition engine and callback recorder for session tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use wake_command::{
    EngineEvents, EngineFactory, EngineSettings, RecognitionEngine, SessionCallbacks,
    SessionHandle, SessionOptions, SessionStatus, WakeError,
};

/// What the mock engine has been asked to do
#[derive(Default)]
struct RemoteState {
    creates: usize,
    starts: Vec<Instant>,
    stops: usize,
    languages: Vec<String>,
    events: Option<EngineEvents>,
    fail_start: bool,
}

/// Shared view into the mock engine, used to drive it and inspect it
#[derive(Clone, Default)]
pub struct EngineRemote(Arc<Mutex<RemoteState>>);

impl EngineRemote {
    pub fn creates(&self) -> usize {
        self.0.lock().unwrap().creates
    }

    pub fn starts(&self) -> usize {
        self.0.lock().unwrap().starts.len()
    }

    pub fn last_start(&self) -> Instant {
        *self.0.lock().unwrap().starts.last().expect("engine never started")
    }

    pub fn stops(&self) -> usize {
        self.0.lock().unwrap().stops
    }

    /// Language configured for each start
    pub fn languages(&self) -> Vec<String> {
        self.0.lock().unwrap().languages.clone()
    }

    pub fn fail_starts(&self, fail: bool) {
        self.0.lock().unwrap().fail_start = fail;
    }

    /// Sink of the current engine run
    pub fn events(&self) -> EngineEvents {
        self.0
            .lock()
            .unwrap()
            .events
            .clone()
            .expect("engine not running")
    }

    pub fn say(&self, transcript: &str, is_final: bool) {
        self.events().result(transcript, is_final);
    }
}

pub struct MockEngine {
    remote: EngineRemote,
    settings: EngineSettings,
}

#[async_trait::async_trait]
impl RecognitionEngine for MockEngine {
    fn configure(&mut self, settings: &EngineSettings) {
        self.settings = settings.clone();
    }

    async fn start(&mut self, events: EngineEvents) -> Result<()> {
        let mut state = self.remote.0.lock().unwrap();
        if state.fail_start {
            return Err(anyhow!("microphone busy"));
        }
        state.starts.push(Instant::now());
        state.languages.push(self.settings.language.clone());
        state.events = Some(events);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let mut state = self.remote.0.lock().unwrap();
        state.stops += 1;
        // Like a browser engine, a stopped run still reports its end
        if let Some(events) = state.events.take() {
            events.end();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub struct MockFactory {
    remote: EngineRemote,
    supported: bool,
}

impl MockFactory {
    pub fn new(remote: EngineRemote) -> Self {
        Self {
            remote,
            supported: true,
        }
    }

    pub fn unsupported(remote: EngineRemote) -> Self {
        Self {
            remote,
            supported: false,
        }
    }
}

impl EngineFactory for MockFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
        self.remote.0.lock().unwrap().creates += 1;
        Ok(Box::new(MockEngine {
            remote: self.remote.clone(),
            settings: EngineSettings::default(),
        }))
    }
}

/// A callback invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    WakeWord,
    Transcription(String),
    Command(String),
    CommandTimeout,
    Error(WakeError),
    Countdown(u64),
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Signal>>>);

impl Recorder {
    pub fn callbacks(&self) -> SessionCallbacks {
        let wake = self.clone();
        let transcription = self.clone();
        let command = self.clone();
        let timeout = self.clone();
        let error = self.clone();
        let countdown = self.clone();

        SessionCallbacks::new()
            .on_wake_word_detected(move || wake.push(Signal::WakeWord))
            .on_transcription(move |text| transcription.push(Signal::Transcription(text.to_string())))
            .on_command(move |text| command.push(Signal::Command(text.to_string())))
            .on_command_timeout(move || timeout.push(Signal::CommandTimeout))
            .on_error(move |e| error.push(Signal::Error(e.clone())))
            .on_countdown(move |secs| countdown.push(Signal::Countdown(secs)))
    }

    fn push(&self, signal: Signal) {
        self.0.lock().unwrap().push(signal);
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.0.lock().unwrap().clone()
    }

    /// Signals other than progress and countdown ticks
    pub fn outcomes(&self) -> Vec<Signal> {
        self.signals()
            .into_iter()
            .filter(|s| !matches!(s, Signal::Transcription(_) | Signal::Countdown(_)))
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.signals()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Command(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, signal: &Signal) -> usize {
        self.signals().iter().filter(|s| *s == signal).count()
    }

    pub fn errors(&self) -> Vec<WakeError> {
        self.signals()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub struct Harness {
    pub session: SessionHandle,
    pub remote: EngineRemote,
    pub recorder: Recorder,
}

impl Harness {
    pub fn new(wake_word: &str) -> Self {
        Self::with_options(SessionOptions::new(wake_word))
    }

    pub fn with_options(options: SessionOptions) -> Self {
        let remote = EngineRemote::default();
        Self::build(options, MockFactory::new(remote.clone()), remote)
    }

    pub fn unsupported(wake_word: &str) -> Self {
        let remote = EngineRemote::default();
        Self::build(
            SessionOptions::new(wake_word),
            MockFactory::unsupported(remote.clone()),
            remote,
        )
    }

    fn build(options: SessionOptions, factory: MockFactory, remote: EngineRemote) -> Self {
        let recorder = Recorder::default();
        let session = wake_command::create(options, recorder.callbacks(), Arc::new(factory))
            .expect("valid session options");
        Self {
            session,
            remote,
            recorder,
        }
    }

    /// Start listening and wait until the session has processed it
    pub async fn started(wake_word: &str) -> Self {
        let harness = Self::new(wake_word);
        harness.session.start().unwrap();
        harness.settle().await;
        harness
    }

    /// Wait until the session has processed every queued input
    ///
    /// Handling one input can queue another (a stopped engine reports its
    /// end), so a few round trips are needed.
    pub async fn settle(&self) -> SessionStatus {
        let mut status = self.session.status().await.expect("session alive");
        for _ in 0..2 {
            status = self.session.status().await.expect("session alive");
        }
        status
    }

    pub async fn say(&self, transcript: &str, is_final: bool) -> SessionStatus {
        self.remote.say(transcript, is_final);
        self.settle().await
    }

    /// Let the paused clock run, then wait for the session to catch up
    pub async fn advance(&self, duration: Duration) -> SessionStatus {
        tokio::time::sleep(duration).await;
        self.settle().await
    }
}
