//! DashScope image API configuration.
//!
//! Covers the outbound endpoints only. The API key itself is never part of
//! the configuration: it is resolved per call from the environment or the
//! inbound request, and never written to a file.

use serde::{Deserialize, Serialize};

/// Configuration for the DashScope generative-image API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashScopeConfig {
    /// API base URL. Override for testing against a local mock.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds for outbound calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DashScopeConfig {
    /// Apply environment overrides. `DASHSCOPE_BASE_URL` beats the file value.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DASHSCOPE_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
    }
}

fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "DASHSCOPE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
