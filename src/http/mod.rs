//! HTTP API for external control of the wake-word session
//!
//! - POST /session/start | stop | pause | resume - Lifecycle control
//! - PUT /session/wake-word - Change the trigger phrase
//! - PUT /session/language - Change the recognition locale
//! - PUT /session/log-level - Change diagnostic verbosity
//! - GET /session/status - Query session status
//! - GET /session/commands - Recently delivered commands
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{record_command, AppState, CommandRecord, COMMAND_HISTORY_LIMIT};
