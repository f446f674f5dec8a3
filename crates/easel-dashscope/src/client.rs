//! HTTP client for the DashScope image endpoints.
//!
//! Generation is asynchronous on the remote side: `submit_generation`
//! creates a job and `await_task` polls it to a terminal state with a
//! bounded retry budget. Image edit is a single synchronous call. One
//! client instance is cheap to clone and holds no credential state; the
//! API key is passed into every call.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use easel_core::DashScopeConfig;

use crate::error::DashScopeError;
use crate::types::{
    EditBody, EditContent, EditInput, EditMessage, EditParameters, EditParams, GenerationBody,
    GenerationInput, GenerationOutput, GenerationParameters, GenerationParams, GenerationResponse,
    ImageEditResult, ImageJob, PollOutcome, TaskStatus,
};

const GENERATION_MODEL: &str = "qwen-image";
const EDIT_MODEL: &str = "qwen-image-edit";

/// Client for the DashScope image generation and edit endpoints.
#[derive(Debug, Clone)]
pub struct DashScopeClient {
    http: reqwest::Client,
    base_url: String,
}

impl DashScopeClient {
    /// Build a client from configuration.
    pub fn new(config: &DashScopeConfig) -> Result<Self, DashScopeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Submit an asynchronous text-to-image generation job.
    ///
    /// The remote service validates the parameters; this client only builds
    /// the request. A 2xx response without a task id is a service-level
    /// error and surfaces as `DashScopeError::Api` carrying the body.
    pub async fn submit_generation(
        &self,
        api_key: &SecretString,
        params: &GenerationParams,
    ) -> Result<ImageJob, DashScopeError> {
        let body = GenerationBody {
            model: GENERATION_MODEL,
            input: GenerationInput {
                prompt: &params.prompt,
                negative_prompt: params.negative_prompt.as_deref(),
            },
            parameters: GenerationParameters {
                size: &params.size,
                n: params.n,
                prompt_extend: params.prompt_extend,
                watermark: params.watermark,
            },
        };

        let url = self.api_url("services/aigc/text2image/image-synthesis");
        debug!(%url, "submitting image generation job");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .header("X-DashScope-Async", "enable")
            .json(&body)
            .send()
            .await?;
        let text = Self::success_text(response).await?;

        let parsed: GenerationResponse = serde_json::from_str(&text)
            .map_err(|e| DashScopeError::Shape(format!("invalid JSON body: {e}")))?;

        match parsed.output {
            Some(GenerationOutput {
                task_id: Some(task_id),
                task_status,
            }) => Ok(ImageJob {
                task_id,
                task_status: task_status.unwrap_or(TaskStatus::Unknown),
                request_id: parsed.request_id.unwrap_or_default(),
            }),
            _ => Err(DashScopeError::Api(text)),
        }
    }

    /// Fetch the current state of a task. Returns the full response body.
    pub async fn fetch_task(
        &self,
        api_key: &SecretString,
        task_id: &str,
    ) -> Result<Value, DashScopeError> {
        let url = self.api_url(&format!("tasks/{task_id}"));

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .send()
            .await?;
        let text = Self::success_text(response).await?;

        serde_json::from_str(&text)
            .map_err(|e| DashScopeError::Shape(format!("invalid JSON body: {e}")))
    }

    /// Poll a task until it reaches a terminal state or the retry budget
    /// runs out.
    ///
    /// Performs at most `max_retries` fetches, sleeping `retry_interval`
    /// after every non-terminal one. FAILED and CANCELED are terminal: the
    /// full body is returned immediately, same as SUCCEEDED. Exhausting the
    /// budget yields `PollOutcome::TimedOut`, a distinct outcome rather
    /// than an error. Any transport fault aborts the loop via `Err`.
    pub async fn await_task(
        &self,
        api_key: &SecretString,
        task_id: &str,
        max_retries: u32,
        retry_interval: Duration,
    ) -> Result<PollOutcome, DashScopeError> {
        for attempt in 1..=max_retries {
            let body = self.fetch_task(api_key, task_id).await?;

            let status = body
                .get("output")
                .and_then(|o| o.get("task_status"))
                .and_then(|s| s.as_str())
                .map(TaskStatus::parse)
                .unwrap_or(TaskStatus::Unknown);

            if status.is_terminal() {
                debug!(task_id, ?status, attempt, "task reached terminal state");
                return Ok(PollOutcome::Finished(body));
            }

            tokio::time::sleep(retry_interval).await;
        }

        warn!(task_id, max_retries, "task not finished within polling budget");
        Ok(PollOutcome::TimedOut {
            task_id: task_id.to_string(),
            attempts: max_retries,
        })
    }

    /// Edit an image through the synchronous multimodal endpoint.
    pub async fn edit_image(
        &self,
        api_key: &SecretString,
        params: &EditParams,
    ) -> Result<ImageEditResult, DashScopeError> {
        let body = EditBody {
            model: EDIT_MODEL,
            input: EditInput {
                messages: [EditMessage {
                    role: "user",
                    content: [
                        EditContent::Image {
                            image: &params.image,
                        },
                        EditContent::Text {
                            text: &params.prompt,
                        },
                    ],
                }],
            },
            parameters: EditParameters {
                prompt_extend: true,
                watermark: false,
                negative_prompt: params.negative_prompt.as_deref(),
            },
        };

        let url = self.api_url("services/aigc/multimodal-generation/generation");
        debug!(%url, "submitting image edit request");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        let text = Self::success_text(response).await?;

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| DashScopeError::Shape(format!("invalid JSON body: {e}")))?;

        let choices = match parsed
            .get("output")
            .and_then(|o| o.get("choices"))
            .and_then(|c| c.as_array())
        {
            Some(choices) => choices,
            None => return Err(DashScopeError::Api(text)),
        };

        let image_url = choices
            .first()
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_array())
            .and_then(|parts| parts.first())
            .and_then(|p| p.get("image"))
            .and_then(|i| i.as_str())
            .ok_or_else(|| {
                DashScopeError::Shape("missing image url in first choice".to_string())
            })?;

        let request_id = parsed
            .get("request_id")
            .and_then(|r| r.as_str())
            .unwrap_or_default();

        Ok(ImageEditResult {
            image_url: image_url.to_string(),
            request_id: request_id.to_string(),
        })
    }

    /// Read the body and map non-2xx statuses to `RemoteStatus`.
    async fn success_text(response: reqwest::Response) -> Result<String, DashScopeError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DashScopeError::RemoteStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(status = status.as_u16(), bytes = text.len(), "DashScope response received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }

    fn client_for(base_url: String) -> DashScopeClient {
        let config = DashScopeConfig {
            base_url,
            ..DashScopeConfig::default()
        };
        DashScopeClient::new(&config).unwrap()
    }

    fn test_key() -> SecretString {
        SecretString::from("test-key".to_string())
    }

    fn generation_params(prompt: &str) -> GenerationParams {
        GenerationParams {
            prompt: prompt.to_string(),
            size: "1328*1328".to_string(),
            n: 1,
            prompt_extend: true,
            watermark: false,
            negative_prompt: None,
        }
    }

    #[tokio::test]
    async fn submit_returns_job_and_sends_async_header() {
        let seen: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::new(Mutex::new(None));
        let seen_in_handler = seen.clone();

        let app = Router::new().route(
            "/api/v1/services/aigc/text2image/image-synthesis",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = seen_in_handler.clone();
                async move {
                    *seen.lock().unwrap() = Some((headers, body));
                    Json(json!({
                        "output": {"task_id": "t1", "task_status": "PENDING"},
                        "request_id": "r1"
                    }))
                }
            }),
        );

        let client = client_for(spawn_server(app).await);
        let job = client
            .submit_generation(&test_key(), &generation_params("a cat"))
            .await
            .unwrap();

        assert_eq!(
            job,
            ImageJob {
                task_id: "t1".to_string(),
                task_status: TaskStatus::Pending,
                request_id: "r1".to_string(),
            }
        );

        let (headers, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(headers.get("x-dashscope-async").unwrap(), "enable");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer test-key");
        assert_eq!(body["model"], "qwen-image");
        assert_eq!(body["input"]["prompt"], "a cat");
        assert!(body["input"].get("negative_prompt").is_none());
        assert_eq!(body["parameters"]["n"], 1);
    }

    #[tokio::test]
    async fn submit_maps_non_2xx_to_remote_status() {
        let app = Router::new().route(
            "/api/v1/services/aigc/text2image/image-synthesis",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"code": "InvalidParameter"})),
                )
            }),
        );

        let client = client_for(spawn_server(app).await);
        let err = client
            .submit_generation(&test_key(), &generation_params("a cat"))
            .await
            .unwrap_err();

        match err {
            DashScopeError::RemoteStatus { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("InvalidParameter"));
            }
            other => panic!("expected RemoteStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_without_task_id_is_api_error() {
        let app = Router::new().route(
            "/api/v1/services/aigc/text2image/image-synthesis",
            post(|| async { Json(json!({"message": "quota exceeded"})) }),
        );

        let client = client_for(spawn_server(app).await);
        let err = client
            .submit_generation(&test_key(), &generation_params("a cat"))
            .await
            .unwrap_err();

        match err {
            DashScopeError::Api(body) => assert!(body.contains("quota exceeded")),
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn await_task_returns_after_terminal_state() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_handler = hits.clone();

        let app = Router::new().route(
            "/api/v1/tasks/{task_id}",
            get(move |Path(task_id): Path<String>| {
                let hits = hits_in_handler.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    let status = if n < 3 { "RUNNING" } else { "SUCCEEDED" };
                    Json(json!({
                        "output": {"task_id": task_id, "task_status": status},
                        "request_id": "r9"
                    }))
                }
            }),
        );

        let client = client_for(spawn_server(app).await);
        let outcome = client
            .await_task(&test_key(), "t42", 5, Duration::from_millis(1))
            .await
            .unwrap();

        match outcome {
            PollOutcome::Finished(body) => {
                assert_eq!(body["output"]["task_status"], "SUCCEEDED");
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn await_task_times_out_after_max_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_handler = hits.clone();

        let app = Router::new().route(
            "/api/v1/tasks/{task_id}",
            get(move |Path(task_id): Path<String>| {
                let hits = hits_in_handler.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "output": {"task_id": task_id, "task_status": "RUNNING"}
                    }))
                }
            }),
        );

        let client = client_for(spawn_server(app).await);
        let outcome = client
            .await_task(&test_key(), "t42", 2, Duration::from_millis(1))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                task_id: "t42".to_string(),
                attempts: 2,
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn await_task_aborts_on_remote_fault() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_handler = hits.clone();

        let app = Router::new().route(
            "/api/v1/tasks/{task_id}",
            get(move |Path(_): Path<String>| {
                let hits = hits_in_handler.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
                }
            }),
        );

        let client = client_for(spawn_server(app).await);
        let err = client
            .await_task(&test_key(), "t42", 5, Duration::from_millis(1))
            .await
            .unwrap_err();

        match err {
            DashScopeError::RemoteStatus { status, .. } => assert_eq!(status, 500),
            other => panic!("expected RemoteStatus, got {other:?}"),
        }
        // The fault is not retried within the budget.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        // Bind and immediately drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{addr}/api/v1"));
        let err = client
            .submit_generation(&test_key(), &generation_params("a cat"))
            .await
            .unwrap_err();

        assert!(matches!(err, DashScopeError::Transport(_)));
    }

    #[tokio::test]
    async fn edit_extracts_first_choice_image() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let seen_in_handler = seen.clone();

        let app = Router::new().route(
            "/api/v1/services/aigc/multimodal-generation/generation",
            post(move |Json(body): Json<Value>| {
                let seen = seen_in_handler.clone();
                async move {
                    *seen.lock().unwrap() = Some(body);
                    Json(json!({
                        "output": {
                            "choices": [{
                                "message": {
                                    "content": [{"image": "https://cdn.example.com/out.png"}]
                                }
                            }]
                        },
                        "request_id": "r7"
                    }))
                }
            }),
        );

        let client = client_for(spawn_server(app).await);
        let result = client
            .edit_image(
                &test_key(),
                &EditParams {
                    prompt: "add a hat".to_string(),
                    image: "https://example.com/in.png".to_string(),
                    negative_prompt: Some("blurry".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            result,
            ImageEditResult {
                image_url: "https://cdn.example.com/out.png".to_string(),
                request_id: "r7".to_string(),
            }
        );

        let body = seen.lock().unwrap().take().unwrap();
        assert_eq!(body["model"], "qwen-image-edit");
        assert_eq!(body["parameters"]["negative_prompt"], "blurry");
        assert_eq!(
            body["input"]["messages"][0]["content"][0]["image"],
            "https://example.com/in.png"
        );
    }

    #[tokio::test]
    async fn edit_without_choices_is_api_error() {
        let app = Router::new().route(
            "/api/v1/services/aigc/multimodal-generation/generation",
            post(|| async { Json(json!({"output": {}, "request_id": "r8"})) }),
        );

        let client = client_for(spawn_server(app).await);
        let err = client
            .edit_image(
                &test_key(),
                &EditParams {
                    prompt: "add a hat".to_string(),
                    image: "https://example.com/in.png".to_string(),
                    negative_prompt: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DashScopeError::Api(_)));
    }
}
