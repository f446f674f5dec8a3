//! Error types for the MCP server plumbing.
//!
//! Tool handlers never produce these: they return strings on both
//! success and failure. `McpError` covers the transport itself.

use thiserror::Error;

/// Errors that can occur running the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start a transport.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Serialization error writing a response.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error on the stdio transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
