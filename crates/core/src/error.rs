//! Error type for glacier directory and configuration operations.

use std::path::PathBuf;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, GdirError>;

/// Errors that can occur while handling records, directories or configuration.
#[derive(Debug, thiserror::Error)]
pub enum GdirError {
    /// I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Identifier cannot key a directory
    #[error("Invalid glacier id {0:?}")]
    InvalidId(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GdirError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}
