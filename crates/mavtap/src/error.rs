//! Error types for mavtap.
//!
//! This module defines all error types used throughout the mavtap crate.
//! Setup-time failures surface here as results; steady-state per-frame
//! failures are carried on the tap event channel instead, so a single bad
//! frame or failed write never tears the session down.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for mavtap operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Endpoint Errors ===
    /// Failed to bind the inbound tap endpoint.
    #[error("failed to bind tap endpoint {addr}: {source}")]
    EndpointBind {
        /// The endpoint that could not be bound.
        addr: SocketAddr,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The inbound endpoint became permanently unusable mid-session.
    #[error("tap source failed: {message}")]
    SourceFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// Operation attempted on a source that has been closed.
    #[error("tap source is closed")]
    SourceClosed,

    // === Log Writer Errors ===
    /// Failed to create the session log file.
    #[error("failed to create log file {path}: {source}")]
    LogCreate {
        /// Path to the log file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for mavtap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new source failure error.
    #[must_use]
    pub fn source_failed(message: impl Into<String>) -> Self {
        Self::SourceFailed {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a setup-time endpoint bind failure.
    #[must_use]
    pub fn is_connect_error(&self) -> bool {
        matches!(self, Self::EndpointBind { .. })
    }

    /// Check if this error indicates the source became unusable mid-session.
    #[must_use]
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::SourceFailed { .. } | Self::SourceClosed)
    }
}
