//! services/portal/src/error.rs
//!
//! Defines the error types of the portal client.

use crate::config::ConfigError;
use mentorship_core::ports::PortError;
use mentorship_core::validation::ValidationError;

/// The primary error type for the `portal` service.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A user-facing operation failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Represents an error from the HTTP client.
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., the client state file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The failure half of a credential or feature operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Rejected client-side; the backend was never called.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("You must be signed in to do that")]
    NotSignedIn,

    #[error("You do not have permission to do that")]
    Forbidden,
}
