//! Error types for the Rezi image composition workflow.
//!
//! Every variant is recoverable: the application model turns it into the single
//! visible message of the form and returns control to idle.

use std::path::PathBuf;
use thiserror::Error;

/// Fallback shown when the generation service fails without a message.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Fallback shown when sharing fails without a message.
pub const SHARE_FAILED_MESSAGE: &str = "Could not share image. Please try downloading it.";

#[derive(Debug, Error)]
pub enum ReziError {
    #[error("Please upload both images and provide a prompt.")]
    MissingInput,

    #[error("You do not have enough credits to generate an image.")]
    InsufficientCredit { balance: u32, required: u32 },

    #[error("{}", non_empty_or(.0, UNEXPECTED_ERROR_MESSAGE))]
    GenerationServiceFailure(String),

    #[error("Sharing is not supported on your browser. Please download the image.")]
    ShareUnsupported,

    #[error("{}", non_empty_or(.0, SHARE_FAILED_MESSAGE))]
    ShareFailed(String),

    #[error("Failed to read image {path:?}: {reason}")]
    ImageReadFailure { path: PathBuf, reason: String },

    #[error("A generation request is already in flight")]
    GenerationInFlight,

    #[error("There is no generated image yet")]
    NoResult,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReziError {
    /// Build a service failure from whatever message the collaborator reported.
    pub fn service_failure(message: impl Into<String>) -> Self {
        ReziError::GenerationServiceFailure(message.into().trim().to_string())
    }

    /// True for the kinds that leave the credit balance untouched before dispatch.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ReziError::MissingInput | ReziError::InsufficientCredit { .. }
        )
    }
}

fn non_empty_or<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.trim().is_empty() {
        fallback
    } else {
        message
    }
}

impl From<config::ConfigError> for ReziError {
    fn from(err: config::ConfigError) -> Self {
        ReziError::Config(err.to_string())
    }
}

impl From<sled::Error> for ReziError {
    fn from(err: sled::Error) -> Self {
        ReziError::Storage(err.to_string())
    }
}
