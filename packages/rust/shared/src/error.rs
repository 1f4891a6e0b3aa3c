//! Error types for tagtree.
//!
//! Library crates use [`TagtreeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Records dropped by an adapter's inclusion policy are not errors; they are
//! reported as [`crate::SkippedRecord`] values and the run continues.

use std::path::PathBuf;

/// Top-level error type for all tagtree operations.
#[derive(Debug, thiserror::Error)]
pub enum TagtreeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The external fetch collaborator failed (transport error or non-success status).
    #[error("fetch failed: {0}")]
    Network(String),

    /// A fetched payload could not be decoded (JSON or CSV).
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad tree path, tree shape conflict, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Canonical serialization rejected a document.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// The run named a source type the pipeline does not know.
    #[error("unsupported source type '{0}' (expected handle-prefixed, flat-keyed or csv-categorized)")]
    UnsupportedSourceType(String),

    /// The requested run mode is rejected outright.
    #[error("{0} mode is not implemented")]
    UnimplementedMode(String),

    /// Two records derived the same tree path under the `error` collision policy.
    #[error("path collision: {path} was written more than once")]
    PathCollision { path: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TagtreeError>;

impl TagtreeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Whether this error came from the fetch/decode collaborators.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TagtreeError::config("missing url");
        assert_eq!(err.to_string(), "config error: missing url");

        let err = TagtreeError::UnsupportedSourceType("rss".into());
        assert!(err.to_string().contains("'rss'"));

        let err = TagtreeError::UnimplementedMode("append".into());
        assert_eq!(err.to_string(), "append mode is not implemented");
    }

    #[test]
    fn fetch_failure_classification() {
        assert!(TagtreeError::Network("HTTP 500".into()).is_fetch_failure());
        assert!(TagtreeError::decode("bad json").is_fetch_failure());
        assert!(!TagtreeError::validation("bad path").is_fetch_failure());
    }
}
