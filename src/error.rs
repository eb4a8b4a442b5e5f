//! Error types for background removal sessions

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Message shown to users when a removal request fails, whatever the cause
pub const REMOVAL_FAILED_MESSAGE: &str = "Error removing background. Please try again.";

/// Error types for background removal operations
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Selected file is not an image
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The remote API did not produce a result.
    ///
    /// Network, authentication, rate limiting and server errors all collapse
    /// into this variant. The payload is diagnostic text for developers only.
    #[error("Background removal failed: {0}")]
    RemovalFailed(String),

    /// Operation not allowed in the current session state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgRemovalError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new removal failure
    pub fn removal_failed<S: Into<String>>(reason: S) -> Self {
        Self::RemovalFailed(reason.into())
    }

    /// Create a new invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error naming the offending parameter
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        expected: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: '{}' (expected {})",
            parameter, value, expected
        ))
    }

    /// Whether this error came from the remote removal request
    #[must_use]
    pub fn is_removal_failure(&self) -> bool {
        matches!(self, Self::RemovalFailed(_))
    }

    /// Text suitable for end users.
    ///
    /// Removal failures never expose their cause; local errors are shown as is.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RemovalFailed(_) => REMOVAL_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}
