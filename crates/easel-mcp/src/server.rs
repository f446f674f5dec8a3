//! MCP server: JSON-RPC dispatch over stdio or HTTP.
//!
//! The server owns registries of tools, resources and prompts that are
//! filled at the composition root; it performs no registration of its
//! own. Dispatch distinguishes protocol-level failures (unknown method,
//! unknown tool, malformed params), which become JSON-RPC errors, from
//! tool-level failures, which are ordinary string results.

use std::io::{BufRead, Write};
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Notify;
use tracing::{debug, info};

use easel_core::{McpConfig, Transport};

use crate::error::McpError;
use crate::http_transport::HttpServer;
use crate::prompts::PromptRegistry;
use crate::protocol::{
    CallToolParams, CallToolResponse, INVALID_PARAMS, JsonRpcRequest, JsonRpcResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, ReadResourceResult, RequestContext,
    ResourceContents, ToolContent,
};
use crate::resources::ResourceRegistry;
use crate::tools::ToolRegistry;

/// The MCP server.
pub struct McpServer {
    config: McpConfig,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    shutdown: Arc<Notify>,
}

impl McpServer {
    /// Create a server with empty registries.
    pub fn new(config: McpConfig) -> Self {
        Self {
            config,
            tools: ToolRegistry::new(),
            resources: ResourceRegistry::new(),
            prompts: PromptRegistry::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Replace the tool registry.
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Replace the resource registry.
    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = resources;
        self
    }

    /// Replace the prompt registry.
    pub fn with_prompts(mut self, prompts: PromptRegistry) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Future that resolves once a client has requested shutdown.
    pub(crate) fn shutdown_requested(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Start the server on the configured transport.
    pub async fn run(self) -> Result<(), McpError> {
        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    /// Serve line-delimited JSON-RPC on stdin/stdout.
    ///
    /// One message per line, responses flushed immediately, notifications
    /// produce no output. Logging goes to stderr so stdout stays a pure
    /// protocol channel.
    async fn run_stdio(&self) -> Result<(), McpError> {
        info!(
            tool_count = self.tools.len(),
            "starting MCP server on stdio transport"
        );

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut stdout_lock = stdout.lock();
        let context = RequestContext::default();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    let response =
                        JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                    writeln!(stdout_lock, "{}", serde_json::to_string(&response)?)?;
                    stdout_lock.flush()?;
                    continue;
                }
            };

            let is_shutdown = request.method == "shutdown";
            if let Some(response) = self.handle_request(request, &context).await {
                writeln!(stdout_lock, "{}", serde_json::to_string(&response)?)?;
                stdout_lock.flush()?;
            }
            if is_shutdown {
                info!("client requested shutdown, leaving stdio loop");
                break;
            }
        }

        Ok(())
    }

    /// Serve JSON-RPC over HTTP.
    async fn run_http(self) -> Result<(), McpError> {
        let addr = self.config.bind_addr();
        info!(
            %addr,
            tool_count = self.tools.len(),
            "starting MCP server on HTTP transport"
        );

        HttpServer::new(addr, Arc::new(self)).run().await
    }

    /// Handle one JSON-RPC request. `None` means the message was a
    /// notification and must produce no response.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        context: &RequestContext,
    ) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        let method = request.method.as_str();
        debug!(method, "handling request");

        if method == "initialized" || method.starts_with("notifications/") {
            return None;
        }

        Some(match method {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params, context).await,
            "resources/list" => self.handle_list_resources(id),
            "resources/templates/list" => self.handle_list_resource_templates(id),
            "resources/read" => self.handle_read_resource(id, request.params).await,
            "prompts/list" => self.handle_list_prompts(id),
            "prompts/get" => self.handle_get_prompt(id, request.params),
            "shutdown" => {
                info!("shutdown requested");
                self.shutdown.notify_one();
                JsonRpcResponse::success(id, Value::Null)
            }
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        })
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "easel",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {},
                "resources": {},
                "prompts": {}
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.tools.definitions() }))
    }

    async fn handle_call_tool(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        context: &RequestContext,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {e}"),
                    );
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let Some(tool) = self.tools.get(&params.name) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Tool not found: {}", params.name),
            );
        };

        let text = tool.call(&params.arguments, context).await;
        let response = CallToolResponse {
            content: vec![ToolContent::Text { text }],
            is_error: Some(false),
        };
        JsonRpcResponse::success(id, json!(response))
    }

    fn handle_list_resources(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "resources": self.resources.definitions() }))
    }

    fn handle_list_resource_templates(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({ "resourceTemplates": self.resources.templates() }),
        )
    }

    async fn handle_read_resource(
        &self,
        id: Option<Value>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let Some(uri) = params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
        else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing uri");
        };

        match self.resources.read(uri).await {
            Some(text) => {
                let result = ReadResourceResult {
                    contents: vec![ResourceContents {
                        uri: uri.to_string(),
                        mime_type: Some("application/json".to_string()),
                        text,
                    }],
                };
                JsonRpcResponse::success(id, json!(result))
            }
            None => JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Resource not found: {uri}"),
            ),
        }
    }

    fn handle_list_prompts(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "prompts": self.prompts.definitions() }))
    }

    fn handle_get_prompt(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(name) = params
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
        else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing name");
        };
        let arguments = params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or(Value::Null);

        let Some(prompt) = self.prompts.get(name) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Prompt not found: {name}"),
            );
        };

        match prompt.render(&arguments) {
            Ok(result) => JsonRpcResponse::success(id, json!(result)),
            Err(msg) => JsonRpcResponse::error(id, INVALID_PARAMS, msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::DataExplorationPrompt;
    use crate::protocol::ToolDefinition;
    use crate::tools::ToolHandler;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: Some("Echo the message argument".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"]
                }),
                annotations: None,
            }
        }

        async fn call(&self, arguments: &Value, _context: &RequestContext) -> String {
            format!("echo: {}", arguments["message"].as_str().unwrap_or(""))
        }
    }

    fn server_with_echo() -> McpServer {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        McpServer::new(McpConfig::default()).with_tools(tools)
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params,
        }
    }

    async fn dispatch(server: &McpServer, method: &str, params: Option<Value>) -> JsonRpcResponse {
        server
            .handle_request(request(method, params), &RequestContext::default())
            .await
            .expect("expected a response")
    }

    #[tokio::test]
    async fn initialize_reports_protocol_and_capabilities() {
        let server = server_with_echo();
        let response = dispatch(&server, "initialize", None).await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "easel");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
    }

    #[tokio::test]
    async fn initialized_and_notifications_produce_no_response() {
        let server = server_with_echo();
        let context = RequestContext::default();

        for method in ["initialized", "notifications/initialized", "notifications/cancelled"] {
            let response = server
                .handle_request(request(method, None), &context)
                .await;
            assert!(response.is_none(), "{method} must not be answered");
        }
    }

    #[tokio::test]
    async fn tools_list_carries_definitions() {
        let server = server_with_echo();
        let response = dispatch(&server, "tools/list", None).await;

        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "echo");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn tools_call_wraps_text_content() {
        let server = server_with_echo();
        let response = dispatch(
            &server,
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"message": "hi"}})),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "echo: hi");
        assert_eq!(result["isError"], false);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let server = server_with_echo();
        let response = dispatch(
            &server,
            "tools/call",
            Some(json!({"name": "nonexistent", "arguments": {}})),
        )
        .await;

        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn malformed_call_params_are_invalid_params() {
        let server = server_with_echo();
        let response = dispatch(&server, "tools/call", Some(json!("not an object"))).await;

        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let server = server_with_echo();
        let response = dispatch(&server, "bogus/method", None).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert!(error.message.contains("bogus/method"));
    }

    #[tokio::test]
    async fn ping_answers_empty_object() {
        let server = server_with_echo();
        let response = dispatch(&server, "ping", None).await;

        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn shutdown_answers_null_result() {
        let server = server_with_echo();
        let response = dispatch(&server, "shutdown", None).await;

        assert!(response.error.is_none());
        assert_eq!(response.result, Some(Value::Null));
    }

    #[tokio::test]
    async fn prompts_round_trip() {
        let mut prompts = PromptRegistry::new();
        prompts.register(Arc::new(DataExplorationPrompt));
        let server = McpServer::new(McpConfig::default()).with_prompts(prompts);

        let listed = dispatch(&server, "prompts/list", None).await;
        assert_eq!(
            listed.result.unwrap()["prompts"][0]["name"],
            "data_exploration_prompt"
        );

        let rendered = dispatch(
            &server,
            "prompts/get",
            Some(json!({"name": "data_exploration_prompt", "arguments": {"table_name": "orders"}})),
        )
        .await;
        let result = rendered.result.unwrap();
        assert_eq!(result["messages"][0]["role"], "user");
        assert!(
            result["messages"][0]["content"]["text"]
                .as_str()
                .unwrap()
                .contains("'orders'")
        );
    }

    #[tokio::test]
    async fn prompt_with_missing_argument_is_invalid_params() {
        let mut prompts = PromptRegistry::new();
        prompts.register(Arc::new(DataExplorationPrompt));
        let server = McpServer::new(McpConfig::default()).with_prompts(prompts);

        let response = dispatch(
            &server,
            "prompts/get",
            Some(json!({"name": "data_exploration_prompt", "arguments": {}})),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert!(error.message.contains("table_name"));
    }

    #[tokio::test]
    async fn unknown_resource_is_invalid_params() {
        let server = server_with_echo();
        let response = dispatch(
            &server,
            "resources/read",
            Some(json!({"uri": "schema://nothing"})),
        )
        .await;

        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn empty_registries_list_empty() {
        let server = McpServer::new(McpConfig::default());

        let tools = dispatch(&server, "tools/list", None).await;
        assert_eq!(tools.result.unwrap()["tools"], json!([]));

        let resources = dispatch(&server, "resources/list", None).await;
        assert_eq!(resources.result.unwrap()["resources"], json!([]));

        let templates = dispatch(&server, "resources/templates/list", None).await;
        assert_eq!(templates.result.unwrap()["resourceTemplates"], json!([]));
    }
}
