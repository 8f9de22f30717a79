use std::path::PathBuf;

/// Unified error type for the autosave crate.
///
/// Backends and configuration loading return these. The snapshot store,
/// scheduler and recovery workflow absorb them into log lines instead of
/// handing them to the editor.
#[derive(Debug, thiserror::Error)]
pub enum AutosaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Storage unavailable: {0}")]
    Unavailable(PathBuf),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using [`AutosaveError`].
pub type AutosaveResult<T> = std::result::Result<T, AutosaveError>;
