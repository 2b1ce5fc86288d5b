use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::providers::{ChatRequest, ImageBackend, LanguageModel, RenderedImage};
use crate::error::ProviderError;
use crate::models::{ImageConfig, OpenAiConfig};

const PROVIDER: &str = "OpenAI";

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

/// Chat message for the chat completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// Request body for the image generations endpoint
#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    moderation: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ProviderError::MissingApiKey(PROVIDER))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config, api_key })
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_connect() {
            ProviderError::ConnectionRefused(format!(
                "Could not connect to OpenAI at {}",
                self.config.url
            ))
        } else if e.is_timeout() {
            ProviderError::Timeout(self.config.timeout_seconds)
        } else {
            ProviderError::from(e)
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}/{}", self.config.url.trim_end_matches('/'), path);
        debug!("Sending request to OpenAI: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpError { provider: PROVIDER, status, message });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    /// Render one image with the given model
    pub async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
        image: &ImageConfig,
    ) -> Result<RenderedImage, ProviderError> {
        // Only gpt-image models accept the moderation parameter
        let moderation = model.starts_with("gpt-image").then_some("auto");
        let request = ImageRequest {
            model,
            prompt,
            n: 1,
            size: &image.size,
            quality: &image.quality,
            moderation,
        };

        let response: ImageResponse = self.post("images/generations", &request).await?;
        let first = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("image response contained no data".to_string()))?;

        let url = match (first.url, first.b64_json) {
            (Some(url), _) => url,
            (None, Some(b64)) => format!("data:image/png;base64,{}", b64),
            (None, None) => {
                return Err(ProviderError::ParseError(
                    "image response contained neither url nor b64_json".to_string(),
                ))
            }
        };

        Ok(RenderedImage { url, revised_prompt: first.revised_prompt })
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let body = CompletionRequest {
            model: self.config.chat_model.clone(),
            messages: vec![
                ChatMessage::system(request.system.as_str()),
                ChatMessage::user(request.user.as_str()),
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response: CompletionResponse = self.post("chat/completions", &body).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::ParseError("completion contained no choices".to_string()))?;

        debug!("Completion returned {} characters", content.len());
        Ok(content)
    }
}

/// One OpenAI image model exposed as a rendering backend
pub struct OpenAiImageBackend {
    client: Arc<OpenAiClient>,
    model: String,
    image: ImageConfig,
}

impl OpenAiImageBackend {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>, image: ImageConfig) -> Self {
        Self { client, model: model.into(), image }
    }
}

#[async_trait]
impl ImageBackend for OpenAiImageBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn render(&self, prompt: &str) -> Result<RenderedImage, ProviderError> {
        self.client.generate_image(&self.model, prompt, &self.image).await
    }
}
