//! Upstream provider seams.
//!
//! Generators talk to the outside world only through these traits, so the
//! HTTP clients can be swapped for in-process fakes.

use async_trait::async_trait;

use crate::error::ProviderError;

mod openai;
mod runway;

pub use openai::{OpenAiClient, OpenAiImageBackend};
pub use runway::RunwayClient;

/// A single-turn chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.7,
            max_tokens: 200,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Return the assistant's reply text
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}

/// Result of one image render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub url: String,
    /// Prompt as rewritten by the backend, when it reports one
    pub revised_prompt: Option<String>,
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Model name recorded as `modelUsed`
    fn model(&self) -> &str;

    async fn render(&self, prompt: &str) -> Result<RenderedImage, ProviderError>;
}

/// Image-to-video submission
#[derive(Debug, Clone, PartialEq)]
pub struct ImageToVideoRequest {
    pub image_url: String,
    pub prompt: String,
}

/// Provider-side state of an asynchronous task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Succeeded,
    Failed,
}

/// One observation of a provider task
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTask {
    pub id: String,
    pub state: TaskState,
    /// Provider's own status word, for logging
    pub raw_status: String,
    pub output_url: Option<String>,
    pub failure: Option<String>,
}

/// A provider whose work outlives the submitting request
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// Human-readable provider name used in failure messages
    fn name(&self) -> &str;

    /// Submit work and return the provider's task id
    async fn submit(&self, request: &ImageToVideoRequest) -> Result<String, ProviderError>;

    async fn task_status(&self, task_id: &str) -> Result<ProviderTask, ProviderError>;
}
