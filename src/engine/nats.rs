use super::backend::{EngineFactory, EngineSettings, RecognitionEngine};
use crate::nats::{ControlAction, NatsClient, RecognitionErrorMessage, TranscriptMessage};
use crate::session::{EngineErrorKind, EngineEvents};
use anyhow::{Context, Result};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Recognition engine backed by a remote STT service over NATS
///
/// Recognition is requested on `stt.control.<session>`; transcripts and
/// errors come back on `stt.text.>` and `stt.error.>` and are filtered by
/// session id.
pub struct NatsEngine {
    url: String,
    session_id: String,
    settings: EngineSettings,
    client: Option<Arc<NatsClient>>,
    task: Option<JoinHandle<()>>,
    events: Option<EngineEvents>,
}

enum Incoming {
    Transcript(async_nats::Message),
    Error(async_nats::Message),
}

impl NatsEngine {
    pub fn new(url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_id: session_id.into(),
            settings: EngineSettings::default(),
            client: None,
            task: None,
            events: None,
        }
    }

    async fn client(&mut self) -> Result<Arc<NatsClient>> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(NatsClient::connect(&self.url, self.session_id.clone()).await?);
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for NatsEngine {
    fn configure(&mut self, settings: &EngineSettings) {
        self.settings = settings.clone();
    }

    async fn start(&mut self, events: EngineEvents) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let client = self.client().await?;

        let transcripts = client
            .subscribe_transcripts()
            .await
            .context("Failed to subscribe to transcripts")?;
        let errors = client
            .subscribe_errors()
            .await
            .context("Failed to subscribe to recognition errors")?;

        client
            .publish_control(ControlAction::Start, &self.settings)
            .await
            .context("Failed to request recognition")?;

        let session_id = self.session_id.clone();
        let sink = events.clone();

        let task = tokio::spawn(async move {
            info!("Recognition receiving task started");

            let mut incoming = futures::stream::select(
                transcripts.map(Incoming::Transcript),
                errors.map(Incoming::Error),
            );

            while let Some(item) = incoming.next().await {
                let delivered = match item {
                    Incoming::Transcript(msg) => {
                        match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                            Ok(transcript) if transcript.session_id == session_id => {
                                sink.result(transcript.text, !transcript.partial)
                            }
                            Ok(_) => true,
                            Err(e) => {
                                warn!("Failed to parse transcript message: {}", e);
                                true
                            }
                        }
                    }
                    Incoming::Error(msg) => {
                        match serde_json::from_slice::<RecognitionErrorMessage>(&msg.payload) {
                            Ok(report) if report.session_id == session_id => {
                                debug!(
                                    "Recognition error {} ({})",
                                    report.code,
                                    report.message.as_deref().unwrap_or("no detail")
                                );
                                sink.error(EngineErrorKind::from_code(&report.code))
                            }
                            Ok(_) => true,
                            Err(e) => {
                                warn!("Failed to parse recognition error message: {}", e);
                                true
                            }
                        }
                    }
                };

                if !delivered {
                    break;
                }
            }

            info!("Recognition receiving task stopped");
            sink.end();
        });

        self.task = Some(task);
        self.events = Some(events);

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(client) = &self.client {
            if let Err(e) = client.publish_control(ControlAction::Stop, &self.settings).await {
                error!("Failed to request recognition stop: {}", e);
            }
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }

        if let Some(events) = self.events.take() {
            events.end();
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Builds [`NatsEngine`]s for one session id
pub struct NatsEngineFactory {
    url: String,
    session_id: String,
}

impl NatsEngineFactory {
    pub fn new(url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_id: session_id.into(),
        }
    }
}

impl EngineFactory for NatsEngineFactory {
    fn is_supported(&self) -> bool {
        self.url.parse::<async_nats::ServerAddr>().is_ok()
    }

    fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
        if !self.is_supported() {
            anyhow::bail!("Invalid NATS server address: {}", self.url);
        }
        Ok(Box::new(NatsEngine::new(self.url.clone(), self.session_id.clone())))
    }
}
