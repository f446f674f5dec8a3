//! MCP server settings: transport selection and the HTTP bind address.

use serde::{Deserialize, Serialize};

/// How and where the MCP server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Selected transport, `stdio` or `http` in YAML.
    #[serde(default)]
    pub transport: Transport,

    /// Bind address for the HTTP transport. Defaults to loopback; set
    /// `0.0.0.0` to accept remote callers.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port for the HTTP transport.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Framing layer carrying the JSON-RPC messages.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Line-delimited JSON-RPC on stdin/stdout, the desktop-client default.
    #[default]
    Stdio,
    /// Streamable HTTP transport.
    Http,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl McpConfig {
    /// True when the HTTP transport is selected.
    pub fn is_http(&self) -> bool {
        self.transport == Transport::Http
    }

    /// True when the stdio transport is selected.
    pub fn is_stdio(&self) -> bool {
        self.transport == Transport::Stdio
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
