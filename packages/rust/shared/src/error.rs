//! Error types for StepGuide.
//!
//! Library crates use [`StepGuideError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all StepGuide operations.
#[derive(Debug, thiserror::Error)]
pub enum StepGuideError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Catalog or page parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (duplicate ids, reserved path names, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A requested article, step, or fallback does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Invalid navigation request against the step runner.
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// Invalid-navigation outcomes reported by the step runner.
///
/// These are ordinary results of user input (a second "Back" on the first
/// step, a stale click after a reset) and are never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no article is active")]
    NoActiveArticle,

    #[error("already at first step")]
    AlreadyAtFirstStep,

    #[error("article mismatch: session is on '{expected}', got '{actual}'")]
    ArticleMismatch { expected: String, actual: String },

    #[error("article '{article_id}' has no fallback path '{fallback_id}'")]
    UnknownFallback {
        article_id: String,
        fallback_id: String,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StepGuideError>;

impl StepGuideError {
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

    /// Create a not-found error for the given entity kind.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
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
