use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::generators::Generator;
use crate::core::prompts::{image_prompt, SYSTEM_PROMPT_IMAGE};
use crate::core::providers::{ChatRequest, ImageBackend, LanguageModel, RenderedImage};
use crate::error::GeneratorError;
use crate::models::{decode, ImageInput, ImageOutput, JobType};

/// Enhances the user's prompt, then renders it with a primary backend and
/// an optional fallback backend
pub struct ImageGenerator {
    llm: Arc<dyn LanguageModel>,
    primary: Arc<dyn ImageBackend>,
    fallback: Option<Arc<dyn ImageBackend>>,
}

impl ImageGenerator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        primary: Arc<dyn ImageBackend>,
        fallback: Option<Arc<dyn ImageBackend>>,
    ) -> Self {
        Self { llm, primary, fallback }
    }

    async fn enhance(&self, prompt: &str) -> String {
        let request = ChatRequest::new(SYSTEM_PROMPT_IMAGE, image_prompt(prompt))
            .temperature(0.7)
            .max_tokens(300);

        match self.llm.complete(&request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!("Prompt enhancement returned nothing, using the original prompt");
                prompt.to_string()
            }
            Err(e) => {
                warn!("Prompt enhancement failed, using the original prompt: {}", e);
                prompt.to_string()
            }
        }
    }

    async fn render(&self, prompt: &str) -> Result<(RenderedImage, String), GeneratorError> {
        let primary_err = match self.primary.render(prompt).await {
            Ok(image) => return Ok((image, self.primary.model().to_string())),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(GeneratorError::new(format!(
                "{} failed: {}",
                self.primary.model(),
                primary_err
            )));
        };

        warn!(
            "{} failed, falling back to {}: {}",
            self.primary.model(),
            fallback.model(),
            primary_err
        );

        match fallback.render(prompt).await {
            Ok(image) => Ok((image, fallback.model().to_string())),
            Err(e) => Err(GeneratorError::new(format!(
                "Both {} and {} failed. {} error: {}",
                self.primary.model(),
                fallback.model(),
                fallback.model(),
                e
            ))),
        }
    }
}

#[async_trait]
impl Generator for ImageGenerator {
    fn job_type(&self) -> JobType {
        JobType::Image
    }

    async fn generate(&self, input: &Value) -> Result<Value, GeneratorError> {
        let input: ImageInput = decode(JobType::Image, input)?;
        let enhanced_prompt = if input.regenerate {
            debug!("Regenerating with the caller's prompt as given");
            input.prompt.clone()
        } else {
            self.enhance(&input.prompt).await
        };
        let (image, model_used) = self.render(&enhanced_prompt).await?;
        info!("Image rendered with {}", model_used);

        let output = ImageOutput {
            image_url: image.url,
            revised_prompt: image.revised_prompt.unwrap_or_else(|| enhanced_prompt.clone()),
            enhanced_prompt,
            model_used,
        };

        serde_json::to_value(output)
            .map_err(|e| GeneratorError::new(format!("Failed to encode image output: {}", e)))
    }
}
