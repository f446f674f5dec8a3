//! # easel-mcp
//!
//! MCP (Model Context Protocol) server for easel.
//!
//! This crate exposes image generation and read-only database analysis as
//! MCP tools, plus schema resources and analysis prompts. It supports:
//!
//! - **Six Tools**: three against the DashScope image API, three against
//!   the configured Postgres database
//! - **Schema Resources**: table listings, per-table schema reports and
//!   index reports under `schema://` URIs
//! - **Analysis Prompts**: canned data-analysis prompt templates
//! - **Multiple Transports**: stdio and HTTP (with SSE channel)
//! - **Per-Call Credentials**: DashScope keys resolved per request, never
//!   cached or logged
//!
//! ## Architecture
//!
//! ```text
//! AI Agent (Claude, etc.)
//!       │
//!       │ MCP protocol (tools / resources / prompts)
//!       ▼
//! ┌──────────────────┐
//! │ easel MCP server │
//! │  dispatch        │
//! │   ├ image tools ─┼──► DashScope API   ← easel-dashscope
//! │   ├ db tools ────┼──► Postgres (RO)   ← easel-pg
//! │   ├ resources ───┼──► Postgres (RO)   ← easel-pg
//! │   └ prompts      │    (no I/O)
//! └──────────────────┘
//! ```
//!
//! Handlers are registered explicitly at the composition root; there is
//! no global registration. Tool handlers are infallible string producers:
//! success and failure both come back as text, distinguished by message
//! prefix, while JSON-RPC errors are reserved for protocol-level faults.
//!
//! ## Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use easel_core::EaselConfig;
//! use easel_mcp::{McpServer, ToolRegistry};
//! use easel_mcp::db_tools::ExecuteReadonlyQueryTool;
//! use easel_pg::Database;
//!
//! let config = EaselConfig::load("easel.yaml")?;
//! let db = Arc::new(Database::new(config.upstream.clone()));
//!
//! let mut tools = ToolRegistry::new();
//! tools.register(Arc::new(ExecuteReadonlyQueryTool::new(db)));
//!
//! let server = McpServer::new(config.mcp).with_tools(tools);
//! server.run().await?;
//! ```

pub mod db_tools;
pub mod error;
pub mod http_transport;
pub mod image_tools;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;

// Re-export main types
pub use error::McpError;
pub use http_transport::{HttpServer, create_router};
pub use prompts::{PromptHandler, PromptRegistry};
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, PromptDefinition,
    RequestContext, ResourceDefinition, ResourceTemplate, ToolAnnotations, ToolContent,
    ToolDefinition,
};
pub use resources::{ResourceHandler, ResourceRegistry, TemplateHandler};
pub use server::McpServer;
pub use tools::{ToolHandler, ToolRegistry};
