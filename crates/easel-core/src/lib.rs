// Configuration types shared across all easel crates
pub mod config;

// Re-export commonly used config types for convenience
pub use config::{ConfigError, DashScopeConfig, EaselConfig, McpConfig, Transport, UpstreamConfig};
