//! Error types for sqlupload-core

use std::path::PathBuf;

/// Result type for sqlupload-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sqlupload-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incomplete configuration; aborts a run before any mutation
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Record store failure
    #[error("Store error: {message}")]
    Store { message: String },

    /// Splitting an artifact failed
    #[error("Failed to split '{id}': {source}")]
    Split {
        id: String,
        #[source]
        source: sqlupload_split::Error,
    },

    /// Telemetry queue or worker failure
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from sqlupload-fs
    #[error(transparent)]
    Fs(#[from] sqlupload_fs::Error),

    /// Database driver error
    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Whether this error should abort a whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::ConfigNotFound { .. })
    }
}
