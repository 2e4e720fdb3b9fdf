//! Recognition engine seam
//!
//! The session only talks to engines through [`RecognitionEngine`] and
//! creates them through an [`EngineFactory`]. Adapters translate their host's
//! notifications into [`EngineEvents`] calls.

pub mod backend;
pub mod nats;

pub use crate::session::{EngineEvent, EngineEvents};
pub use backend::{EngineFactory, EngineSettings, RecognitionEngine};
pub use nats::{NatsEngine, NatsEngineFactory};
