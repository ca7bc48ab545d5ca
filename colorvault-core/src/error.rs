/*!
Error types for the ColorVault core engine.
*/

use thiserror::Error;

/// Result type used throughout the ColorVault core.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur during extraction and persistence operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An archive could not be opened or decompressed
    #[error("Failed to extract {archive}: {source}")]
    Extraction {
        archive: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Archive decoder errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// No decoder is available for the archive format
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// Key-value backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl VaultError {
    /// Create a new archive error
    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a failure of one archive, keeping the archive's display name
    pub fn extraction<S, E>(archive: S, cause: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Extraction {
            archive: archive.into(),
            source: cause.into(),
        }
    }
}
