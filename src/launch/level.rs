//! Worker log levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity passed to the worker with `-l`, ordered from quietest to most
/// verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    None = 0,
    Emergency = 1,
    Alert = 2,
    Critical = 3,
    Error = 4,
    Warning = 5,
    Notice = 6,
    Info = 7,
    Debug = 8,
}

#[derive(Debug, thiserror::Error)]
#[error("Unrecognized log level '{0}'; expected LOG_NONE..LOG_DEBUG or 0..8")]
pub struct LogLevelError(pub String);

impl LogLevel {
    pub const ALL: [LogLevel; 9] = [
        LogLevel::None,
        LogLevel::Emergency,
        LogLevel::Alert,
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    /// Integer severity understood by the worker
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "LOG_NONE",
            LogLevel::Emergency => "LOG_EMERGENCY",
            LogLevel::Alert => "LOG_ALERT",
            LogLevel::Critical => "LOG_CRIT",
            LogLevel::Error => "LOG_ERR",
            LogLevel::Warning => "LOG_WARNING",
            LogLevel::Notice => "LOG_NOTICE",
            LogLevel::Info => "LOG_INFO",
            LogLevel::Debug => "LOG_DEBUG",
        }
    }

    pub fn from_severity(value: u8) -> Option<Self> {
        LogLevel::ALL.get(usize::from(value)).copied()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(level) = LogLevel::ALL.into_iter().find(|l| l.as_str() == s) {
            return Ok(level);
        }
        s.parse::<u8>()
            .ok()
            .and_then(LogLevel::from_severity)
            .ok_or_else(|| LogLevelError(s.to_string()))
    }
}
