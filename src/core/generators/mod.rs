//! Generator capabilities: one per job type.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::providers::{
    ImageBackend, LanguageModel, OpenAiClient, OpenAiImageBackend, RunwayClient, TaskProvider,
};
use crate::error::GeneratorError;
use crate::models::{Config, JobType};

mod image;
mod styles;
mod track_info;
mod video;

pub use image::ImageGenerator;
pub use styles::StylesGenerator;
pub use track_info::TrackInfoGenerator;
pub use video::{truncate_prompt, VideoGenerator};

/// How a generator's result relates to job completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorMode {
    /// The returned output is final
    Synchronous,
    /// The returned output is provisional and carries a provider task id;
    /// the external task poller finishes the job
    ProviderAsync,
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn job_type(&self) -> JobType;

    fn mode(&self) -> GeneratorMode {
        GeneratorMode::Synchronous
    }

    async fn generate(&self, input: &Value) -> Result<Value, GeneratorError>;
}

/// Generators and asynchronous task providers, keyed by job type
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<JobType, Arc<dyn Generator>>,
    task_providers: HashMap<JobType, Arc<dyn TaskProvider>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, generator: Arc<dyn Generator>) {
        info!("Registered {} generator ({:?})", generator.job_type(), generator.mode());
        self.generators.insert(generator.job_type(), generator);
    }

    /// Register the provider the external task poller queries for `job_type`
    pub fn register_task_provider(&mut self, job_type: JobType, provider: Arc<dyn TaskProvider>) {
        self.task_providers.insert(job_type, provider);
    }

    pub fn generator(&self, job_type: JobType) -> Option<Arc<dyn Generator>> {
        self.generators.get(&job_type).cloned()
    }

    pub fn task_provider(&self, job_type: JobType) -> Option<Arc<dyn TaskProvider>> {
        self.task_providers.get(&job_type).cloned()
    }

    /// Build the production registry (OpenAI for text and images, Runway for video).
    ///
    /// Job types whose provider has no API key are left unregistered; jobs of
    /// those types fail when processed.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        let openai = match OpenAiClient::new(config.openai.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("OpenAI generators disabled: {}", e);
                None
            }
        };

        if let Some(client) = &openai {
            let llm: Arc<dyn LanguageModel> = client.clone();
            registry.register(Arc::new(StylesGenerator::new(llm.clone())));
            registry.register(Arc::new(TrackInfoGenerator::new(llm.clone())));

            let primary: Arc<dyn ImageBackend> = Arc::new(OpenAiImageBackend::new(
                client.clone(),
                config.image.primary_model.clone(),
                config.image.clone(),
            ));
            let fallback: Arc<dyn ImageBackend> = Arc::new(OpenAiImageBackend::new(
                client.clone(),
                config.image.fallback_model.clone(),
                config.image.clone(),
            ));
            registry.register(Arc::new(ImageGenerator::new(llm, primary, Some(fallback))));
        }

        match RunwayClient::new(config.runway.clone()) {
            Ok(runway) => {
                let runway: Arc<dyn TaskProvider> = Arc::new(runway);
                let llm = openai.map(|c| c as Arc<dyn LanguageModel>);
                registry.register(Arc::new(VideoGenerator::new(
                    llm,
                    runway.clone(),
                    config.runway.max_prompt_chars,
                )));
                registry.register_task_provider(JobType::Video, runway);
            }
            Err(e) => warn!("Video generator disabled: {}", e),
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_keys_registers_nothing() {
        let registry = GeneratorRegistry::from_config(&Config::default());
        for job_type in JobType::ALL {
            assert!(registry.generator(job_type).is_none());
        }
        assert!(registry.task_provider(JobType::Video).is_none());
    }

    #[test]
    fn test_from_config_with_keys() {
        let config = Config::default().with_api_keys(|_| Some("key".to_string()));
        let registry = GeneratorRegistry::from_config(&config);
        for job_type in JobType::ALL {
            assert!(registry.generator(job_type).is_some(), "missing {}", job_type);
        }
        assert_eq!(
            registry.generator(JobType::Video).unwrap().mode(),
            GeneratorMode::ProviderAsync
        );
        assert_eq!(
            registry.generator(JobType::Image).unwrap().mode(),
            GeneratorMode::Synchronous
        );
        assert!(registry.task_provider(JobType::Video).is_some());
    }
}
