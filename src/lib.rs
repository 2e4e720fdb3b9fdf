pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod http;
pub mod logging;
pub mod nats;
pub mod session;

pub use config::Config;
pub use engine::{EngineFactory, EngineSettings, NatsEngine, NatsEngineFactory, RecognitionEngine};
pub use error::WakeError;
pub use extract::{extract_command, CaptureContext};
pub use http::{create_router, AppState};
pub use logging::LogLevel;
pub use nats::{NatsClient, TranscriptMessage};
pub use session::{
    create, CaptureState, EngineErrorKind, EngineEvent, EngineEvents, LifecycleState,
    SessionCallbacks, SessionHandle, SessionOptions, SessionStatus, SessionTiming,
};
