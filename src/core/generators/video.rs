use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::generators::{Generator, GeneratorMode};
use crate::core::prompts::{video_prompt, SYSTEM_PROMPT_VIDEO};
use crate::core::providers::{ChatRequest, ImageToVideoRequest, LanguageModel, TaskProvider};
use crate::error::GeneratorError;
use crate::models::{decode, JobType, VideoInput, VideoOutput};

const ELLIPSIS: &str = "...";

/// Cap a prompt at `max_chars` characters, marking the cut with an ellipsis.
///
/// A limit too small to hold the ellipsis gets a bare cut instead.
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> String {
    if prompt.chars().count() <= max_chars {
        return prompt.to_string();
    }
    if max_chars < ELLIPSIS.len() {
        return prompt.chars().take(max_chars).collect();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = prompt.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Submits image-to-video work to a task provider.
///
/// Returns a provisional output carrying the provider task id; the job stays
/// processing until the external task poller records the outcome.
pub struct VideoGenerator {
    llm: Option<Arc<dyn LanguageModel>>,
    provider: Arc<dyn TaskProvider>,
    max_prompt_chars: usize,
}

impl VideoGenerator {
    pub fn new(
        llm: Option<Arc<dyn LanguageModel>>,
        provider: Arc<dyn TaskProvider>,
        max_prompt_chars: usize,
    ) -> Self {
        Self { llm, provider, max_prompt_chars }
    }

    async fn motion_prompt(&self, input: &VideoInput) -> String {
        let Some(llm) = &self.llm else {
            return input.prompt.clone();
        };

        let request = ChatRequest::new(SYSTEM_PROMPT_VIDEO, video_prompt(input))
            .temperature(0.7)
            .max_tokens(150);

        match llm.complete(&request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => input.prompt.clone(),
            Err(e) => {
                warn!("Motion prompt generation failed, using the base prompt: {}", e);
                input.prompt.clone()
            }
        }
    }
}

#[async_trait]
impl Generator for VideoGenerator {
    fn job_type(&self) -> JobType {
        JobType::Video
    }

    fn mode(&self) -> GeneratorMode {
        GeneratorMode::ProviderAsync
    }

    async fn generate(&self, input: &Value) -> Result<Value, GeneratorError> {
        let input: VideoInput = decode(JobType::Video, input)?;

        let prompt = truncate_prompt(&self.motion_prompt(&input).await, self.max_prompt_chars);
        let request = ImageToVideoRequest {
            image_url: input.image_url.clone(),
            prompt: prompt.clone(),
        };

        let task_id = self.provider.submit(&request).await?;
        info!(task_id = %task_id, "Submitted video task to {}", self.provider.name());

        serde_json::to_value(VideoOutput::provisional(task_id, prompt))
            .map_err(|e| GeneratorError::new(format!("Failed to encode video output: {}", e)))
    }
}
