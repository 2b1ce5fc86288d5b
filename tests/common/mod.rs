//! Common test utilities: in-process fake providers and client wiring

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vjobs::core::generators::{ImageGenerator, StylesGenerator, TrackInfoGenerator, VideoGenerator};
use vjobs::core::prompts::{
    SYSTEM_PROMPT_IMAGE, SYSTEM_PROMPT_STYLES, SYSTEM_PROMPT_TRACK_INFO, SYSTEM_PROMPT_VIDEO,
};
use vjobs::core::providers::{
    ChatRequest, ImageBackend, ImageToVideoRequest, LanguageModel, ProviderTask, RenderedImage,
    TaskProvider, TaskState,
};
use vjobs::core::{GeneratorRegistry, JobClient, JobManager, MemoryJobStore};
use vjobs::error::ProviderError;
use vjobs::models::{Config, JobType};

type Reply = Box<dyn Fn(&ChatRequest) -> Result<String, ProviderError> + Send + Sync>;

/// Language model answering from a closure
pub struct FakeLanguageModel {
    reply: Reply,
    pub calls: AtomicUsize,
}

impl FakeLanguageModel {
    pub fn new(
        reply: impl Fn(&ChatRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
        })
    }

    /// Plausible answers for every system prompt
    pub fn standard() -> Arc<Self> {
        Self::new(|request| {
            let reply = if request.system == SYSTEM_PROMPT_STYLES {
                r#"["Neon Grid Pulse", "Liquid Chrome Flow", "Cosmic Dust Drift", "Fractal Bloom Waves"]"#
            } else if request.system == SYSTEM_PROMPT_TRACK_INFO {
                "```json\n{\"bpm\": 128, \"phases\": [\"intro\", \"buildup\", \"drop\", \"breakdown\", \"outro\"]}\n```"
            } else if request.system == SYSTEM_PROMPT_IMAGE {
                "Glowing aurora ribbons over a dark horizon, volumetric light"
            } else if request.system == SYSTEM_PROMPT_VIDEO {
                "Slow zoom through pulsing aurora ribbons"
            } else {
                "unexpected prompt"
            };
            Ok(reply.to_string())
        })
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(request)
    }
}

/// Image backend that either renders a fixed URL or rejects with HTTP 400
pub struct FakeImageBackend {
    pub model: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeImageBackend {
    pub fn new(model: &str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            fail,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ImageBackend for FakeImageBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn render(&self, _prompt: &str) -> Result<RenderedImage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::HttpError {
                provider: "OpenAI",
                status: 400,
                message: "Your request was rejected by the safety system".to_string(),
            });
        }
        Ok(RenderedImage {
            url: format!("https://images.test/{}.png", self.model),
            revised_prompt: Some(format!("{} revised", self.model)),
        })
    }
}

/// One scripted answer to a task status query
#[derive(Debug, Clone)]
pub enum Step {
    Running,
    Succeeded(&'static str),
    Failed(Option<&'static str>),
    Unreachable,
}

/// Task provider that replays a script of status answers; the last step repeats
pub struct FakeTaskProvider {
    task_id: String,
    script: Mutex<VecDeque<Step>>,
    pub submitted: Mutex<Vec<ImageToVideoRequest>>,
    pub status_calls: AtomicUsize,
}

impl FakeTaskProvider {
    pub fn new(task_id: &str, script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            task_id: task_id.to_string(),
            script: Mutex::new(script.into()),
            submitted: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        })
    }

    fn next_step(&self) -> Step {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Step::Running)
        }
    }
}

#[async_trait]
impl TaskProvider for FakeTaskProvider {
    fn name(&self) -> &str {
        "Runway"
    }

    async fn submit(&self, request: &ImageToVideoRequest) -> Result<String, ProviderError> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok(self.task_id.clone())
    }

    async fn task_status(&self, task_id: &str) -> Result<ProviderTask, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let task = |state: TaskState, raw: &str, url: Option<&str>, failure: Option<&str>| ProviderTask {
            id: task_id.to_string(),
            state,
            raw_status: raw.to_string(),
            output_url: url.map(str::to_string),
            failure: failure.map(str::to_string),
        };
        match self.next_step() {
            Step::Running => Ok(task(TaskState::Running, "RUNNING", None, None)),
            Step::Succeeded(url) => Ok(task(TaskState::Succeeded, "SUCCEEDED", Some(url), None)),
            Step::Failed(reason) => Ok(task(TaskState::Failed, "FAILED", None, reason)),
            Step::Unreachable => Err(ProviderError::ConnectionRefused(
                "api.dev.runwayml.com".to_string(),
            )),
        }
    }
}

/// Config with millisecond poll intervals
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.polling.job_interval_ms = 5;
    config.polling.video_interval_ms = 5;
    config.polling.task_id_interval_ms = 5;
    config.polling.task_id_max_attempts = 200;
    config.polling.transient_backoff_ms = 5;
    config.processing.workers = 2;
    config.processing.generator_timeout_seconds = 5;
    config
}

/// Registry wired to the given fakes
pub fn registry(
    llm: Arc<FakeLanguageModel>,
    primary: Arc<FakeImageBackend>,
    fallback: Arc<FakeImageBackend>,
    provider: Arc<FakeTaskProvider>,
) -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::new();
    registry.register(Arc::new(StylesGenerator::new(llm.clone())));
    registry.register(Arc::new(TrackInfoGenerator::new(llm.clone())));
    let fallback: Arc<dyn ImageBackend> = fallback;
    registry.register(Arc::new(ImageGenerator::new(llm.clone(), primary, Some(fallback))));
    let llm: Arc<dyn LanguageModel> = llm;
    registry.register(Arc::new(VideoGenerator::new(Some(llm), provider.clone(), 1000)));
    registry.register_task_provider(JobType::Video, provider);
    registry
}

/// Registry with well-behaved fakes and the given task provider
pub fn standard_registry(provider: Arc<FakeTaskProvider>) -> GeneratorRegistry {
    registry(
        FakeLanguageModel::standard(),
        FakeImageBackend::new("gpt-image-1", false),
        FakeImageBackend::new("dall-e-3", false),
        provider,
    )
}

/// Client over an in-memory store
pub fn client(registry: GeneratorRegistry) -> JobClient {
    let manager = JobManager::shared(MemoryJobStore::shared());
    JobClient::new(manager, registry, &test_config())
}
