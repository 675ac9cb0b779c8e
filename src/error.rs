//! Error types for `deck_sync`.
//!
//! Library code returns [`SyncError`] through the crate [`Result`] alias.
//! The binary maps each error onto an [`ErrorCode`] to pick a stable
//! machine-readable code and a process exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// All failures surfaced by the sync pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// The HTTP request itself failed (connection refused, timeout, bad body).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-null `error` field.
    #[error("{action} failed: {message}")]
    Remote { action: String, message: String },

    #[error("AnkiConnect is not reachable at {endpoint}")]
    Unreachable { endpoint: String },

    #[error("missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("required note type '{name}' is not available in Anki")]
    MissingItemType { name: String },

    #[error("decision cache {} is malformed: {reason}", path.display())]
    MalformedCache { path: PathBuf, reason: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl SyncError {
    /// Build a validation error for a named field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build an error for a remote call that reported failure.
    pub fn remote(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) | Self::Yaml(_) => ErrorCode::Config,
            Self::Io(_) => ErrorCode::Io,
            Self::Json(_) | Self::Csv(_) | Self::Validation { .. } => ErrorCode::InvalidInput,
            Self::Http(_) | Self::Unreachable { .. } => ErrorCode::Transport,
            Self::Remote { .. } => ErrorCode::Remote,
            Self::MissingColumns { .. } | Self::MissingItemType { .. } => {
                ErrorCode::Precondition
            }
            Self::MalformedCache { .. } => ErrorCode::MalformedCache,
        }
    }
}

/// Stable error categories used for exit codes and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Config,
    Io,
    InvalidInput,
    Transport,
    Remote,
    Precondition,
    MalformedCache,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "CONFIG_ERROR",
            Self::Io => "IO_ERROR",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Transport => "TRANSPORT_ERROR",
            Self::Remote => "REMOTE_ERROR",
            Self::Precondition => "PRECONDITION_FAILED",
            Self::MalformedCache => "MALFORMED_CACHE",
        }
    }

    /// Process exit status for this category.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Precondition => 2,
            Self::Transport => 3,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
