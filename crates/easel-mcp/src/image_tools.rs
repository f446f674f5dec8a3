//! Image generation and editing tools backed by the DashScope client.
//!
//! Each tool resolves an API key per call through the configured
//! [`CredentialResolver`], so a hosted deployment can serve callers with
//! different keys from the same process. Client errors are flattened to
//! prefix-labeled strings; callers distinguish outcomes by prefix, not
//! by a separate error channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use easel_dashscope::{
    CredentialResolver, DashScopeClient, DashScopeError, EditParams, GenerationParams,
    PollOutcome,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::protocol::{RequestContext, ToolAnnotations, ToolDefinition};
use crate::tools::{ToolHandler, optional_bool, optional_str, optional_u64, required_str};

const DEFAULT_SIZE: &str = "1328*1328";
const DEFAULT_MAX_RETRIES: u64 = 30;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 3;

/// Map a client error onto the tool-result prefix vocabulary.
pub(crate) fn dashscope_error_string(err: &DashScopeError) -> String {
    match err {
        DashScopeError::Authentication(msg) => format!("Authentication error: {msg}"),
        DashScopeError::Transport(e) => format!("Request error: {e}"),
        DashScopeError::RemoteStatus { status, body } => {
            format!("HTTP error: {status} - {body}")
        }
        DashScopeError::Shape(_) => format!("API response error: {err}"),
        DashScopeError::Api(body) => format!("API response error: {body}"),
    }
}

fn render_compact<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!("API response error: failed to serialize response: {e}"))
}

/// `generate_image`: submit an asynchronous text-to-image job.
pub struct GenerateImageTool {
    client: Arc<DashScopeClient>,
    resolver: CredentialResolver,
}

impl GenerateImageTool {
    pub fn new(client: Arc<DashScopeClient>, resolver: CredentialResolver) -> Self {
        Self { client, resolver }
    }
}

#[async_trait]
impl ToolHandler for GenerateImageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generate_image".to_string(),
            description: Some(
                "Submit an asynchronous text-to-image job to the qwen-image model. \
                 Returns the task id and initial status as JSON; fetch the final \
                 result with get_image_generation_result."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Positive prompt describing the desired image content and style"
                    },
                    "size": {
                        "type": "string",
                        "description": "Output resolution as width*height. Supported: 1664*928 (16:9), 1472*1140 (4:3), 1328*1328 (square), 1140*1472 (3:4), 928*1664 (9:16)",
                        "default": DEFAULT_SIZE
                    },
                    "n": {
                        "type": "integer",
                        "description": "Number of images to generate (the service currently supports 1)",
                        "default": 1
                    },
                    "prompt_extend": {
                        "type": "boolean",
                        "description": "Whether to let the service rewrite the prompt",
                        "default": true
                    },
                    "watermark": {
                        "type": "boolean",
                        "description": "Whether to watermark the output",
                        "default": false
                    },
                    "negative_prompt": {
                        "type": "string",
                        "description": "Negative prompt describing content to keep out of the image"
                    }
                },
                "required": ["prompt"]
            }),
            annotations: Some(ToolAnnotations {
                title: Some("Generate Image".to_string()),
                read_only_hint: Some(false),
            }),
        }
    }

    async fn call(&self, arguments: &Value, context: &RequestContext) -> String {
        let prompt = match required_str(arguments, "prompt") {
            Ok(p) => p,
            Err(msg) => return msg,
        };
        let n = match optional_u64(arguments, "n") {
            Some(v) => match u32::try_from(v) {
                Ok(v) => v,
                Err(_) => return "Invalid arguments: 'n' is out of range".to_string(),
            },
            None => 1,
        };
        let params = GenerationParams {
            prompt: prompt.to_string(),
            size: optional_str(arguments, "size").unwrap_or(DEFAULT_SIZE).to_string(),
            n,
            prompt_extend: optional_bool(arguments, "prompt_extend").unwrap_or(true),
            watermark: optional_bool(arguments, "watermark").unwrap_or(false),
            negative_prompt: optional_str(arguments, "negative_prompt")
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        let api_key = match self.resolver.resolve(context.authorization.as_deref()) {
            Ok(key) => key,
            Err(err) => return dashscope_error_string(&err),
        };

        match self.client.submit_generation(&api_key, &params).await {
            Ok(job) => {
                debug!(task_id = %job.task_id, "image generation job submitted");
                render_compact(&job)
            }
            Err(err) => dashscope_error_string(&err),
        }
    }
}

/// `get_image_generation_result`: poll a task to completion.
pub struct GetImageGenerationResultTool {
    client: Arc<DashScopeClient>,
    resolver: CredentialResolver,
}

impl GetImageGenerationResultTool {
    pub fn new(client: Arc<DashScopeClient>, resolver: CredentialResolver) -> Self {
        Self { client, resolver }
    }
}

#[async_trait]
impl ToolHandler for GetImageGenerationResultTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_image_generation_result".to_string(),
            description: Some(
                "Poll an image generation task until it reaches a terminal state \
                 and return the final task payload as JSON, including image URLs."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "Task id returned by generate_image"
                    },
                    "max_retries": {
                        "type": "integer",
                        "description": "Maximum number of status fetches before giving up",
                        "default": DEFAULT_MAX_RETRIES
                    },
                    "retry_interval": {
                        "type": "integer",
                        "description": "Seconds to wait after each non-terminal fetch",
                        "default": DEFAULT_RETRY_INTERVAL_SECS
                    }
                },
                "required": ["task_id"]
            }),
            annotations: Some(ToolAnnotations {
                title: Some("Get Image Generation Result".to_string()),
                read_only_hint: Some(true),
            }),
        }
    }

    async fn call(&self, arguments: &Value, context: &RequestContext) -> String {
        let task_id = match required_str(arguments, "task_id") {
            Ok(t) => t,
            Err(msg) => return msg,
        };
        let max_retries = optional_u64(arguments, "max_retries").unwrap_or(DEFAULT_MAX_RETRIES);
        let max_retries = match u32::try_from(max_retries) {
            Ok(v) => v,
            Err(_) => return "Invalid arguments: 'max_retries' is out of range".to_string(),
        };
        let retry_interval = Duration::from_secs(
            optional_u64(arguments, "retry_interval").unwrap_or(DEFAULT_RETRY_INTERVAL_SECS),
        );

        let api_key = match self.resolver.resolve(context.authorization.as_deref()) {
            Ok(key) => key,
            Err(err) => return dashscope_error_string(&err),
        };

        match self
            .client
            .await_task(&api_key, task_id, max_retries, retry_interval)
            .await
        {
            Ok(PollOutcome::Finished(body)) => render_compact(&body),
            Ok(PollOutcome::TimedOut { task_id, attempts }) => {
                format!("Polling timed out: task {task_id} not finished after {attempts} attempts")
            }
            Err(err) => dashscope_error_string(&err),
        }
    }
}

/// `image_edit_generation`: single-shot image edit.
pub struct ImageEditTool {
    client: Arc<DashScopeClient>,
    resolver: CredentialResolver,
}

impl ImageEditTool {
    pub fn new(client: Arc<DashScopeClient>, resolver: CredentialResolver) -> Self {
        Self { client, resolver }
    }
}

#[async_trait]
impl ToolHandler for ImageEditTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "image_edit_generation".to_string(),
            description: Some(
                "Edit an image with the qwen-image-edit model. Returns the edited \
                 image URL and request id as JSON."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Instruction describing the desired edit"
                    },
                    "image": {
                        "type": "string",
                        "description": "Publicly reachable URL of the source image (JPG, JPEG, PNG, BMP, TIFF or WEBP; 512-4096 px per side; at most 10 MB)"
                    },
                    "negative_prompt": {
                        "type": "string",
                        "description": "Negative prompt describing content to keep out of the result"
                    }
                },
                "required": ["prompt", "image"]
            }),
            annotations: Some(ToolAnnotations {
                title: Some("Image Edit Generation".to_string()),
                read_only_hint: Some(false),
            }),
        }
    }

    async fn call(&self, arguments: &Value, context: &RequestContext) -> String {
        let prompt = match required_str(arguments, "prompt") {
            Ok(p) => p,
            Err(msg) => return msg,
        };
        let image = match required_str(arguments, "image") {
            Ok(i) => i,
            Err(msg) => return msg,
        };
        let params = EditParams {
            prompt: prompt.to_string(),
            image: image.to_string(),
            negative_prompt: optional_str(arguments, "negative_prompt")
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        let api_key = match self.resolver.resolve(context.authorization.as_deref()) {
            Ok(key) => key,
            Err(err) => return dashscope_error_string(&err),
        };

        match self.client.edit_image(&api_key, &params).await {
            Ok(result) => {
                debug!(request_id = %result.request_id, "image edit completed");
                render_compact(&result)
            }
            Err(err) => dashscope_error_string(&err),
        }
    }
}
