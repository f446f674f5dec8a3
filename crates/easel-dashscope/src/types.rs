//! Request and response types for the DashScope image APIs.

use serde::{Deserialize, Serialize};

/// Status of an asynchronous image generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    /// Any status string the service sends that we do not recognize.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Parse a raw status string; unrecognized values become `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELED" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    /// Terminal states never transition again; polling stops on them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// An asynchronous generation job as reported at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageJob {
    pub task_id: String,
    pub task_status: TaskStatus,
    pub request_id: String,
}

/// Result of the synchronous image edit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEditResult {
    pub image_url: String,
    pub request_id: String,
}

/// Outcome of a bounded poll for a task's terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The task reached a terminal state; carries the full response body.
    Finished(serde_json::Value),
    /// All attempts were used without reaching a terminal state.
    TimedOut { task_id: String, attempts: u32 },
}

/// Caller-supplied parameters for a text-to-image generation job.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub prompt: String,
    pub size: String,
    pub n: u32,
    pub prompt_extend: bool,
    pub watermark: bool,
    pub negative_prompt: Option<String>,
}

/// Caller-supplied parameters for an image edit call.
#[derive(Debug, Clone)]
pub struct EditParams {
    pub prompt: String,
    pub image: String,
    pub negative_prompt: Option<String>,
}

// Wire shapes for the two POST endpoints. The generation endpoint carries
// negative_prompt on `input`, the edit endpoint on `parameters`; that
// asymmetry is the remote API's, not ours.

#[derive(Debug, Serialize)]
pub(crate) struct GenerationBody<'a> {
    pub model: &'a str,
    pub input: GenerationInput<'a>,
    pub parameters: GenerationParameters<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationInput<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationParameters<'a> {
    pub size: &'a str,
    pub n: u32,
    pub prompt_extend: bool,
    pub watermark: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerationResponse {
    #[serde(default)]
    pub output: Option<GenerationOutput>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerationOutput {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_status: Option<TaskStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EditBody<'a> {
    pub model: &'a str,
    pub input: EditInput<'a>,
    pub parameters: EditParameters<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EditInput<'a> {
    pub messages: [EditMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct EditMessage<'a> {
    pub role: &'a str,
    pub content: [EditContent<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum EditContent<'a> {
    Image { image: &'a str },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
pub(crate) struct EditParameters<'a> {
    pub prompt_extend: bool,
    pub watermark: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
}
