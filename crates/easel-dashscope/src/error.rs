//! Error types for the DashScope client.

use thiserror::Error;

/// Errors that can occur when calling the DashScope API.
#[derive(Debug, Error)]
pub enum DashScopeError {
    /// No usable API key could be resolved for this call.
    #[error("{0}")]
    Authentication(String),

    /// Network-level failure reaching the remote API.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The remote API answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    /// A 2xx response whose body is missing an expected field.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// A 2xx response carrying a service-level error payload.
    #[error("{0}")]
    Api(String),
}
