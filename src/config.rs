use crate::logging::LogLevel;
use crate::session::{SessionOptions, SessionTiming};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub wake: WakeConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    /// STT session id; generated when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WakeConfig {
    pub wake_word: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default = "default_min_command_length")]
    pub min_command_length: usize,
    #[serde(default = "default_inactivity_timeout_ms")]
    pub inactivity_timeout_ms: u64,
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_command_timeout_ms() -> u64 {
    3000
}

fn default_min_command_length() -> usize {
    1
}

fn default_inactivity_timeout_ms() -> u64 {
    30_000
}

fn default_max_restart_attempts() -> u32 {
    5
}

impl WakeConfig {
    /// Session options for this configuration
    pub fn to_options(&self, session_id: Option<&str>) -> SessionOptions {
        let mut options = SessionOptions::new(self.wake_word.clone());
        if let Some(id) = session_id {
            options.session_id = id.to_string();
        }
        options.language = self.language.clone();
        options.command_timeout = Duration::from_millis(self.command_timeout_ms);
        options.log_level = self.log_level;
        options.min_command_length = self.min_command_length;
        options.timing = SessionTiming {
            inactivity_timeout: Duration::from_millis(self.inactivity_timeout_ms),
            max_restart_attempts: self.max_restart_attempts,
            ..SessionTiming::default()
        };
        options
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
