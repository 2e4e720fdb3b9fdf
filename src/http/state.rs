use crate::session::SessionHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Commands kept for `GET /session/commands`
pub const COMMAND_HISTORY_LIMIT: usize = 100;

/// A command delivered by the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The wake-word session under control
    pub session: SessionHandle,

    /// Most recent commands, oldest first
    pub commands: Arc<RwLock<VecDeque<CommandRecord>>>,
}

impl AppState {
    pub fn new(session: SessionHandle, commands: Arc<RwLock<VecDeque<CommandRecord>>>) -> Self {
        Self { session, commands }
    }
}

/// Append a command, dropping the oldest past the history limit
pub async fn record_command(commands: &RwLock<VecDeque<CommandRecord>>, text: &str) {
    let mut commands = commands.write().await;
    commands.push_back(CommandRecord {
        text: text.to_string(),
        received_at: Utc::now(),
    });
    while commands.len() > COMMAND_HISTORY_LIMIT {
        commands.pop_front();
    }
}
