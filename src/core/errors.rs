//! VL-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, VlError>;

/// Stage of channel acquisition that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStage {
    Socket,
    Bind,
    Register,
}

impl OpenStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Socket => "socket",
            Self::Bind => "bind",
            Self::Register => "register",
        }
    }
}

impl std::fmt::Display for OpenStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the Validator listener.
#[derive(Debug, Error)]
pub enum VlError {
    #[error("[VL-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[VL-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[VL-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[VL-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[VL-2001] Validator channel {stage} failed: {source}")]
    ChannelOpen {
        stage: OpenStage,
        #[source]
        source: std::io::Error,
    },

    #[error("[VL-2002] Validator channel receive failed: {source}")]
    ChannelReceive {
        #[source]
        source: std::io::Error,
    },

    #[error("[VL-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[VL-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[VL-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl VlError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "VL-1001",
            Self::MissingConfig { .. } => "VL-1002",
            Self::ConfigParse { .. } => "VL-1003",
            Self::UnsupportedPlatform { .. } => "VL-1101",
            Self::ChannelOpen { .. } => "VL-2001",
            Self::ChannelReceive { .. } => "VL-2002",
            Self::Serialization { .. } => "VL-2101",
            Self::Io { .. } => "VL-3002",
            Self::Runtime { .. } => "VL-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Channel acquisition is deliberately excluded: the listener never
    /// retries opening the Validator channel.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelReceive { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub const fn open(stage: OpenStage, source: std::io::Error) -> Self {
        Self::ChannelOpen { stage, source }
    }
}

impl From<serde_json::Error> for VlError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for VlError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for VlError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_message_prefix() {
        let errors = [
            VlError::InvalidConfig {
                details: "x".to_string(),
            },
            VlError::open(
                OpenStage::Bind,
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ),
            VlError::ChannelReceive {
                source: std::io::Error::from(std::io::ErrorKind::Interrupted),
            },
            VlError::io("/tmp/x", std::io::Error::from(std::io::ErrorKind::NotFound)),
        ];
        for err in errors {
            let rendered = err.to_string();
            assert!(
                rendered.starts_with(&format!("[{}]", err.code())),
                "{rendered} does not carry {}",
                err.code()
            );
        }
    }

    #[test]
    fn open_errors_are_not_retryable() {
        let err = VlError::open(
            OpenStage::Socket,
            std::io::Error::from(std::io::ErrorKind::Unsupported),
        );
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("socket"));
        let err = VlError::ChannelReceive {
            source: std::io::Error::from(std::io::ErrorKind::WouldBlock),
        };
        assert!(err.is_retryable());
    }
}
