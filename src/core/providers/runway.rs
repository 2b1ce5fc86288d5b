use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::providers::{ImageToVideoRequest, ProviderTask, TaskProvider, TaskState};
use crate::error::ProviderError;
use crate::models::RunwayConfig;

const PROVIDER: &str = "Runway";

/// Runway image-to-video API client
pub struct RunwayClient {
    client: Client,
    config: RunwayConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    model: &'a str,
    prompt_image: &'a str,
    prompt_text: &'a str,
    duration: u32,
    ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Option<Vec<TaskOutput>>,
    #[serde(default)]
    failure: Option<TaskFailure>,
}

/// Output entries arrive either as bare URLs or as `{ "url": ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskOutput {
    Url(String),
    Object { url: String },
}

impl TaskOutput {
    fn url(self) -> String {
        match self {
            TaskOutput::Url(url) | TaskOutput::Object { url } => url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskFailure {
    Message(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

impl TaskFailure {
    fn message(self) -> Option<String> {
        match self {
            TaskFailure::Message(m) => Some(m),
            TaskFailure::Object { message } => message,
        }
    }
}

fn task_state(status: &str) -> TaskState {
    match status {
        "SUCCEEDED" => TaskState::Succeeded,
        "FAILED" | "CANCELLED" => TaskState::Failed,
        _ => TaskState::Running,
    }
}

impl RunwayClient {
    pub fn new(config: RunwayConfig) -> Result<Self, ProviderError> {
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

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_connect() {
            ProviderError::ConnectionRefused(format!(
                "Could not connect to Runway at {}",
                self.config.url
            ))
        } else if e.is_timeout() {
            ProviderError::Timeout(self.config.timeout_seconds)
        } else {
            ProviderError::from(e)
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(ProviderError::HttpError { provider: PROVIDER, status, message })
    }
}

#[async_trait]
impl TaskProvider for RunwayClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn submit(&self, request: &ImageToVideoRequest) -> Result<String, ProviderError> {
        let body = SubmitRequest {
            model: &self.config.model,
            prompt_image: &request.image_url,
            prompt_text: &request.prompt,
            duration: self.config.duration,
            ratio: &self.config.ratio,
        };

        let response = self
            .client
            .post(self.url("image_to_video"))
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let parsed: SubmitResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        debug!("Runway accepted task {}", parsed.id);
        Ok(parsed.id)
    }

    async fn task_status(&self, task_id: &str) -> Result<ProviderTask, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("tasks/{}", task_id)))
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let parsed: TaskResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        debug!("Runway task {} status: {}", task_id, parsed.status);
        Ok(into_task(task_id, parsed))
    }
}

fn into_task(task_id: &str, parsed: TaskResponse) -> ProviderTask {
    let state = task_state(&parsed.status);
    ProviderTask {
        id: parsed.id.unwrap_or_else(|| task_id.to_string()),
        state,
        raw_status: parsed.status,
        output_url: parsed
            .output
            .and_then(|outputs| outputs.into_iter().next())
            .map(TaskOutput::url),
        failure: parsed.failure.and_then(TaskFailure::message),
    }
}
