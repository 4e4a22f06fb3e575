//! Error types shared across SteadyHand crates.

use std::path::PathBuf;

/// Top-level error type for SteadyHand operations.
#[derive(Debug, thiserror::Error)]
pub enum SteadyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input hook error: {message}")]
    Hook { message: String },

    #[error("Hotkey error: {message}")]
    Hotkey { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

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

/// Result type alias using SteadyError.
pub type SteadyResult<T> = Result<T, SteadyError>;

impl SteadyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn hook(msg: impl Into<String>) -> Self {
        Self::Hook {
            message: msg.into(),
        }
    }

    pub fn hotkey(msg: impl Into<String>) -> Self {
        Self::Hotkey {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
