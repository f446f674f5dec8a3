//! CLI command implementations for the easel MCP server.

pub mod serve;
pub mod tools;
