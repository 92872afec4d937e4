//! Error handling module for the hpcforge engine.
//!
//! Provides centralized error handling with proper error types using thiserror.
//! The variants map the failure taxonomy of the engine: resolution errors
//! (unsupported platform), execution errors (non-zero exit, spawn failure),
//! registry errors (duplicate/unknown repository ids, malformed definition
//! files) and plain IO/JSON passthrough.

use thiserror::Error;

/// Main error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Resolution errors: the OS identity is outside the supported enumeration.
    /// Fatal, surfaced immediately, never retried with a default command set.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A checked command exited non-zero.
    #[error("command failed with exit code {exit_code}: {command}")]
    CommandFailed { command: String, exit_code: i32 },

    /// The live backend could not spawn the child process at all.
    #[error("failed to spawn command: {0}")]
    SpawnFailed(String),

    /// A repository with this id is already registered.
    #[error("duplicate repository id: {0}")]
    DuplicateRepository(String),

    /// Enable/disable was called on an id the registry has never seen.
    #[error("unknown repository id: {0}")]
    UnknownRepository(String),

    /// Batch enable/disable completed for the known ids but some were unknown.
    #[error("unknown repository ids: {}", .0.join(", "))]
    UnknownRepositories(Vec<String>),

    /// A repository definition file is missing required fields or unparseable.
    #[error("malformed repository file {path}: {reason}")]
    MalformedRepoFile { path: String, reason: String },

    /// Validation errors (plan contents, user input).
    #[error("validation error: {0}")]
    Validation(String),

    /// IO errors (file operations, pipes).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

// Convenient error constructors
impl EngineError {
    /// Create an unsupported-platform error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(msg.into())
    }

    /// Create a command-failed error.
    pub fn command_failed(command: impl Into<String>, exit_code: i32) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
        }
    }

    /// Create a spawn-failure error.
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::SpawnFailed(msg.into())
    }

    /// Create a malformed-repo-file error.
    pub fn malformed_repo(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRepoFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
