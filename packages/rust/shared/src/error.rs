//! Error types for studyplan.
//!
//! Library crates use [`StudyPlanError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all studyplan operations.
#[derive(Debug, thiserror::Error)]
pub enum StudyPlanError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the assistant endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Date or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Assistant API error (bad response shape, missing key, ...).
    #[error("assistant error: {0}")]
    Assistant(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Rejected user input (empty theme, correct > attempted, reversed dates, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A user, topic or log entry that does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StudyPlanError>;

impl StudyPlanError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a not-found error from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = StudyPlanError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = StudyPlanError::validation("correct answers exceed attempted");
        assert!(err.to_string().contains("exceed attempted"));

        let err = StudyPlanError::not_found("topic 'Asma'");
        assert_eq!(err.to_string(), "not found: topic 'Asma'");
    }

    #[test]
    fn io_error_keeps_path() {
        let err = StudyPlanError::io(
            "/tmp/studyplan.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("studyplan.toml"));
    }
}
