//! Structured error types for sheetai
//!
//! Turn-level faults (model service, spreadsheet service, configuration,
//! credentials). Per-command validation failures live in
//! [`crate::command::CommandError`] and never surface here.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Primary error type for sheetai operations
#[derive(Error, Debug)]
pub enum SheetAiError {
    // =========================================================================
    // Model Service Errors
    // =========================================================================
    /// Authentication/authorization errors
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded (429)
    #[error("rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    /// Provider returned an error
    #[error("provider error: {status} - {message}")]
    ProviderError { status: u16, message: String },

    /// Provider answered 2xx but with no usable text
    #[error("empty response from model {model}")]
    EmptyResponse { model: String },

    // =========================================================================
    // Spreadsheet Service Errors
    // =========================================================================
    /// Spreadsheet API rejected the call (permission, not-found, bad range)
    #[error("spreadsheet API error: {status} - {message}")]
    BackendError { status: u16, message: String },

    // =========================================================================
    // Credential Errors
    // =========================================================================
    /// Credentials file is missing fields or unreadable
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// Access token expired and no refresh token is available
    #[error("authentication token expired")]
    TokenExpired,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Missing required config
    #[error("missing required configuration: {key}")]
    MissingConfig { key: String },

    /// File not found
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    // =========================================================================
    // Network Errors
    // =========================================================================
    /// Network/connection error
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Timeout
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    // =========================================================================
    // External Error Wrappers
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SheetAiError {
    /// True when the remote service could not be reached at all.
    ///
    /// The session reports these with a fixed marker instead of the error text.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }

    /// Check if error requires user action
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. }
                | Self::InvalidCredentials { .. }
                | Self::TokenExpired
                | Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => {
                "Authentication failed. Please check your API key.".to_string()
            }
            Self::TokenExpired => {
                "Spreadsheet token expired. Run `sheetai auth` to sign in again.".to_string()
            }
            Self::MissingConfig { key } => {
                format!("'{}' is not configured. Set it in config.toml or the environment.", key)
            }
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => {
                "Failed to connect to the model service.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for SheetAiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration on the error
            return Self::Timeout {
                duration: Duration::ZERO,
            };
        }
        if err.is_connect() {
            return Self::ConnectionFailed {
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return Self::Json(err.to_string());
        }
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for SheetAiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias using SheetAiError
pub type Result<T> = std::result::Result<T, SheetAiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_errors() {
        assert!(SheetAiError::ConnectionFailed {
            message: "refused".to_string()
        }
        .is_connectivity());

        assert!(SheetAiError::Timeout {
            duration: Duration::from_secs(30)
        }
        .is_connectivity());

        assert!(!SheetAiError::ProviderError {
            status: 500,
            message: "boom".to_string()
        }
        .is_connectivity());

        assert!(!SheetAiError::BackendError {
            status: 403,
            message: "forbidden".to_string()
        }
        .is_connectivity());
    }

    #[test]
    fn test_user_messages() {
        let err = SheetAiError::MissingConfig {
            key: "sheets.spreadsheet_id".to_string(),
        };
        assert!(err.user_message().contains("sheets.spreadsheet_id"));
        assert!(err.requires_user_action());

        let err = SheetAiError::ConnectionFailed {
            message: "dns".to_string(),
        };
        assert_eq!(err.user_message(), "Failed to connect to the model service.");
        assert!(!err.requires_user_action());
    }
}
