//! Error types for apk2aab
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Broad failure categories shared by every apk2aab tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A tool, runtime or file that must exist beforehand is absent
    MissingPrerequisite,
    /// The input exists but cannot be interpreted
    MalformedInput,
    /// An external process failed, timed out or could not be started
    ExternalTool,
    /// Downloading failed
    Network,
    /// Configuration is incomplete or unreadable
    Configuration,
    /// Local filesystem failure
    Io,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingPrerequisite => "missing prerequisite",
            FailureKind::MalformedInput => "malformed input",
            FailureKind::ExternalTool => "external tool failure",
            FailureKind::Network => "network failure",
            FailureKind::Configuration => "configuration error",
            FailureKind::Io => "I/O error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the shared core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{what} is not configured; set {env_var} or add it to the config file")]
    MissingSecret {
        what: &'static str,
        env_var: &'static str,
    },

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Classify the error
    pub fn kind(&self) -> FailureKind {
        match self {
            CoreError::Io(_) | CoreError::Logging(_) => FailureKind::Io,
            CoreError::Config(_) | CoreError::TomlParse { .. } | CoreError::MissingSecret { .. } => {
                FailureKind::Configuration
            }
            CoreError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                FailureKind::MissingPrerequisite
            }
            CoreError::Spawn { .. } | CoreError::Timeout { .. } | CoreError::ToolFailed { .. } => {
                FailureKind::ExternalTool
            }
        }
    }
}
