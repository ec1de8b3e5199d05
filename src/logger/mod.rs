//! JSONL append-only logging with graceful degradation to stderr.

pub mod jsonl;

pub use jsonl::{LogCapture, LogRecord, Logger};

use serde::{Deserialize, Serialize};

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Lifecycle chatter.
    Debug,
    /// Notable but expected events.
    Info,
    /// Degraded operation.
    Warning,
    /// Failed operation; the component keeps running.
    Error,
    /// Security findings and loss of the feature.
    Critical,
}

impl LogLevel {
    /// Lowercase label used in records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
