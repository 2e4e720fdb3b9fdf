//! Severity filter for session diagnostics
//!
//! Sessions log through `tracing`, but each session also carries its own
//! [`LogLevel`] that can be changed at runtime with `set_log_level`. The
//! [`session_log!`] macro checks that level before handing the record to the
//! installed subscriber.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Diagnostic verbosity, from silent to everything
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    None,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    All,
}

impl LogLevel {
    /// Whether a record of `severity` passes this filter
    pub fn allows(self, severity: LogLevel) -> bool {
        severity != LogLevel::None && severity <= self
    }

    /// Equivalent subscriber filter, used when installing `tracing_subscriber`
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::All => LevelFilter::TRACE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::All => "all",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(LogLevel::None),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "all" | "trace" => Ok(LogLevel::All),
            other => Err(format!(
                "unknown log level '{}' (expected none, error, warn, info, debug or all)",
                other
            )),
        }
    }
}

/// Log through `tracing` only if the given session level allows it
///
/// `session_log!(level, warn, "...", args)`
macro_rules! session_log {
    ($level:expr, error, $($arg:tt)+) => {
        if $level.allows($crate::logging::LogLevel::Error) {
            ::tracing::error!($($arg)+)
        }
    };
    ($level:expr, warn, $($arg:tt)+) => {
        if $level.allows($crate::logging::LogLevel::Warn) {
            ::tracing::warn!($($arg)+)
        }
    };
    ($level:expr, info, $($arg:tt)+) => {
        if $level.allows($crate::logging::LogLevel::Info) {
            ::tracing::info!($($arg)+)
        }
    };
    ($level:expr, debug, $($arg:tt)+) => {
        if $level.allows($crate::logging::LogLevel::Debug) {
            ::tracing::debug!($($arg)+)
        }
    };
    ($level:expr, trace, $($arg:tt)+) => {
        if $level.allows($crate::logging::LogLevel::All) {
            ::tracing::trace!($($arg)+)
        }
    };
}

pub(crate) use session_log;
