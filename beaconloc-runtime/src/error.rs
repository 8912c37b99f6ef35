//! Runtime error type

use std::path::PathBuf;

use beaconloc_core::LocalizationError;
use thiserror::Error;

/// Result alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised by the host around the localization engine
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deployment rejected: {0}")]
    Localization(#[from] LocalizationError),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid preset {preset}: {reason}")]
    InvalidPreset { preset: String, reason: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Cannot watch {}: no modification time", .0.display())]
    Unwatchable(PathBuf),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
