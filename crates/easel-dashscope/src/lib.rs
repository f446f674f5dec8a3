//! Client for the DashScope (Alibaba Cloud Bailian) generative-image API.
//!
//! Two remote endpoints are covered: asynchronous text-to-image generation
//! (submit a job, then poll `GET /tasks/{task_id}` until a terminal state)
//! and a synchronous single-shot image edit call. Credentials are resolved
//! per call from an ordered list of sources and never cached.

pub mod client;
pub mod credentials;
pub mod error;
pub mod types;

pub use client::DashScopeClient;
pub use credentials::{CredentialResolver, CredentialSource};
pub use error::DashScopeError;
pub use types::{
    EditParams, GenerationParams, ImageEditResult, ImageJob, PollOutcome, TaskStatus,
};
