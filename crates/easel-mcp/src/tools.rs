//! Tool handler trait and registry.
//!
//! Handlers self-describe through [`ToolHandler::definition`] and are
//! registered explicitly at the composition root; there is no global
//! registration. Handlers are infallible string producers: success and
//! failure both come back as the text the caller sees, distinguished
//! only by message prefix.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::protocol::{RequestContext, ToolDefinition};

/// A callable MCP tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and input schema advertised by `tools/list`.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool. Never fails at the type level; diagnostics are
    /// returned as prefix-labeled strings.
    async fn call(&self, arguments: &Value, context: &RequestContext) -> String;
}

/// Registry of tools in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a handler. Re-registering a name replaces the earlier
    /// handler.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().name;
        self.tools.retain(|t| t.definition().name != name);
        self.tools.push(handler);
    }

    /// Look up a handler by tool name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.iter().find(|t| t.definition().name == name)
    }

    /// Definitions of all registered tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Registered tool names.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Fetch a required string argument, rejecting empty values.
pub(crate) fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, String> {
    match arguments.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(format!(
            "Invalid arguments: '{key}' must be a non-empty string"
        )),
    }
}

pub(crate) fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

pub(crate) fn optional_bool(arguments: &Value, key: &str) -> Option<bool> {
    arguments.get(key).and_then(Value::as_bool)
}

pub(crate) fn optional_u64(arguments: &Value, key: &str) -> Option<u64> {
    arguments.get(key).and_then(Value::as_u64)
}

pub(crate) fn optional_i64(arguments: &Value, key: &str) -> Option<i64> {
    arguments.get(key).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestContext;
    use serde_json::json;

    struct StaticTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl ToolHandler for StaticTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.to_string(),
                description: Some(format!("static tool {}", self.name)),
                input_schema: json!({"type": "object"}),
                annotations: None,
            }
        }

        async fn call(&self, _arguments: &Value, _context: &RequestContext) -> String {
            self.reply.to_string()
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool {
            name: "alpha",
            reply: "a",
        }));

        assert!(registry.get("alpha").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool {
            name: "alpha",
            reply: "a",
        }));
        registry.register(Arc::new(StaticTool {
            name: "beta",
            reply: "b",
        }));

        assert_eq!(registry.names(), vec!["alpha", "beta"]);
    }

    #[test]
    fn reregistering_replaces_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool {
            name: "alpha",
            reply: "old",
        }));
        registry.register(Arc::new(StaticTool {
            name: "alpha",
            reply: "new",
        }));

        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn handler_call_goes_through_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool {
            name: "alpha",
            reply: "hello",
        }));

        let handler = registry.get("alpha").unwrap();
        let reply = handler
            .call(&json!({}), &RequestContext::default())
            .await;
        assert_eq!(reply, "hello");
    }

    #[test]
    fn required_str_rejects_missing_and_empty() {
        assert!(required_str(&json!({}), "sql").is_err());
        assert!(required_str(&json!({"sql": ""}), "sql").is_err());
        assert!(required_str(&json!({"sql": "   "}), "sql").is_err());
        assert_eq!(required_str(&json!({"sql": "SELECT 1"}), "sql"), Ok("SELECT 1"));
    }
}
