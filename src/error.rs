//! Error types and handling for Elektra
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Elektra operations
pub type Result<T> = std::result::Result<T, ElektraError>;

/// Main error type for Elektra
#[derive(Debug, Error)]
pub enum ElektraError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication/authorization errors (bad or expired credentials)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Network-related errors (transient, retryable)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors (transient, retryable)
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Malformed or unexpected provider data (not retryable within a cycle)
    #[error("Data error: {message}")]
    Data { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl ElektraError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ElektraError::Config {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        ElektraError::Auth {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        ElektraError::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        ElektraError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new data error
    pub fn data<S: Into<String>>(message: S) -> Self {
        ElektraError::Data {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ElektraError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ElektraError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        ElektraError::Generic {
            message: message.into(),
        }
    }

    /// Whether a retry with backoff is a reasonable response to this error.
    ///
    /// Auth and data errors are not transient: retrying them without an
    /// external change (new credentials, fixed provider payload) cannot
    /// succeed, so the coordinator surfaces them instead.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ElektraError::Network { .. } | ElektraError::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for ElektraError {
    fn from(err: std::io::Error) -> Self {
        ElektraError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ElektraError {
    fn from(err: serde_yaml::Error) -> Self {
        ElektraError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ElektraError {
    fn from(err: serde_json::Error) -> Self {
        ElektraError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ElektraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ElektraError::timeout(err.to_string())
        } else {
            ElektraError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for ElektraError {
    fn from(err: chrono::ParseError) -> Self {
        ElektraError::validation("datetime", &err.to_string())
    }
}
