use super::messages::{ControlAction, RecognitionControlMessage};
use crate::engine::EngineSettings;
use anyhow::{Context, Result};
use async_nats::Client;
use tracing::{debug, info};

/// Subject carrying partial and final transcripts
pub const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

/// Subject carrying recognition errors
pub const ERROR_SUBJECT: &str = "stt.error.>";

pub struct NatsClient {
    client: Client,
    session_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, session_id })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Ask the STT service to start or stop recognizing for this session
    pub async fn publish_control(&self, action: ControlAction, settings: &EngineSettings) -> Result<()> {
        let subject = format!("stt.control.{}", self.session_id);

        let message = RecognitionControlMessage {
            session_id: self.session_id.clone(),
            action,
            language: settings.language.clone(),
            continuous: settings.continuous,
            interim_results: settings.interim_results,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish recognition control")?;

        debug!("Published {:?} to {} (lang={})", action, subject, settings.language);

        Ok(())
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // The STT service publishes to stt.text.partial and stt.text.final;
        // messages are filtered by session_id in the payload
        info!("Subscribing to transcripts on {}", TRANSCRIPT_SUBJECT);

        let subscriber = self
            .client
            .subscribe(TRANSCRIPT_SUBJECT.to_string())
            .await
            .context("Failed to subscribe to transcripts")?;

        Ok(subscriber)
    }

    /// Subscribe to recognition error messages
    pub async fn subscribe_errors(&self) -> Result<async_nats::Subscriber> {
        let subscriber = self
            .client
            .subscribe(ERROR_SUBJECT.to_string())
            .await
            .context("Failed to subscribe to recognition errors")?;

        Ok(subscriber)
    }
}
