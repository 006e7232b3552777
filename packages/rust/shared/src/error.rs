//! Error types for TopicBase.
//!
//! Library crates use [`TopicBaseError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-site failures (`Transport`, `NotFound`, `Parse`) isolate one site
//! from the working set and never abort the run; only seed acquisition
//! surfaces them as fatal.

use std::path::PathBuf;

/// Top-level error type for all TopicBase operations.
#[derive(Debug, thiserror::Error)]
pub enum TopicBaseError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transient network failure: timeout, DNS, connection refused, TLS.
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP 404: the resource is permanently gone.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Malformed HTML or an empty body where content was expected.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TopicBaseError>;

impl TopicBaseError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a transport error from any displayable message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Whether this error isolates a single site rather than the whole run.
    pub fn is_site_scoped(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::NotFound { .. } | Self::Parse { .. }
        )
    }
}
