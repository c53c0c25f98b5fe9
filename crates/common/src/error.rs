//! Error types shared across Cutforge crates.

use std::path::PathBuf;

/// Top-level error type for Cutforge operations.
#[derive(Debug, thiserror::Error)]
pub enum CutforgeError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Media resolution error: {message}")]
    MediaResolution { message: String },

    #[error("Compile error: {message}")]
    Compile { message: String },

    #[error("Host operation error: {message}")]
    HostOperation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CutforgeError.
pub type CutforgeResult<T> = Result<T, CutforgeError>;

impl CutforgeError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn media_resolution(msg: impl Into<String>) -> Self {
        Self::MediaResolution {
            message: msg.into(),
        }
    }

    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile {
            message: msg.into(),
        }
    }

    pub fn host_operation(msg: impl Into<String>) -> Self {
        Self::HostOperation {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
