//! Error types for Swirl.

use thiserror::Error;

/// Result type alias using Swirl's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Swirl.
#[derive(Error, Debug)]
pub enum Error {
    // Audio errors
    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    // Timer errors
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Returns true if the audio backend could not be acquired.
    ///
    /// Such errors switch the dispatcher into fallback mode for good.
    pub const fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }

    /// Returns true if this error only affects a single cue.
    pub const fn is_per_cue(&self) -> bool {
        matches!(self, Self::Synthesis(_) | Self::InvalidArgument(_))
    }
}
