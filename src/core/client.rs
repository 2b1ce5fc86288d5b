//! Caller-facing operations: submit a job and wait for its result.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::dispatcher::Dispatcher;
use crate::core::generators::{GeneratorMode, GeneratorRegistry};
use crate::core::manager::JobManager;
use crate::core::poller::ExternalTaskPoller;
use crate::core::processor::JobProcessor;
use crate::error::{GeneratorError, VjobsError};
use crate::models::{
    Config, ImageInput, ImageOutput, Job, JobStatus, JobType, PollingConfig, ProviderStatus,
    StylesInput, StylesOutput, TrackInfoInput, TrackInfoOutput, VideoInput, VideoOutput,
};

/// Creates jobs, hands them to the dispatcher and polls them to completion
pub struct JobClient {
    manager: Arc<JobManager>,
    processor: Arc<JobProcessor>,
    poller: ExternalTaskPoller,
    registry: Arc<GeneratorRegistry>,
    dispatcher: Dispatcher,
    polling: PollingConfig,
}

impl JobClient {
    /// Wire processor, dispatcher and poller around a manager.
    ///
    /// Must be called inside a tokio runtime; the dispatcher spawns its workers here.
    pub fn new(manager: Arc<JobManager>, registry: GeneratorRegistry, config: &Config) -> Self {
        let registry = Arc::new(registry);
        let processor = Arc::new(JobProcessor::new(
            manager.clone(),
            registry.clone(),
            config.processing.generator_timeout(),
        ));
        let dispatcher = Dispatcher::start(processor.clone(), config.processing.workers);
        let poller = ExternalTaskPoller::new(manager.clone(), registry.clone());

        Self {
            manager,
            processor,
            poller,
            registry,
            dispatcher,
            polling: config.polling.clone(),
        }
    }

    pub fn manager(&self) -> &Arc<JobManager> {
        &self.manager
    }

    pub fn processor(&self) -> &Arc<JobProcessor> {
        &self.processor
    }

    pub fn poller(&self) -> &ExternalTaskPoller {
        &self.poller
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    /// Mode of the generator registered for `job_type`; unregistered types
    /// fail synchronously
    pub fn mode(&self, job_type: JobType) -> GeneratorMode {
        self.registry
            .generator(job_type)
            .map(|g| g.mode())
            .unwrap_or(GeneratorMode::Synchronous)
    }

    /// Create a job and queue it for processing; returns without waiting
    pub async fn submit(&self, job_type: JobType, input: Value) -> Result<String, VjobsError> {
        let id = self.manager.create(job_type, input).await?;
        self.dispatcher.dispatch(&id)?;
        Ok(id)
    }

    /// Wait for queued work to finish and stop the workers
    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }

    /// Poll a job until it is terminal, reporting every fetch to `on_update`
    pub async fn poll_job<F>(&self, job_id: &str, mut on_update: F) -> Result<Job, VjobsError>
    where
        F: FnMut(&Job),
    {
        loop {
            let job = self.manager.get(job_id).await?;
            on_update(&job);

            match job.status {
                JobStatus::Completed => return Ok(job),
                JobStatus::Failed => return Err(failure(&job)),
                JobStatus::Pending | JobStatus::Processing => {
                    sleep(self.polling.job_interval()).await;
                }
            }
        }
    }

    /// Poll a provider-async job: the store first, then the provider task.
    ///
    /// Transient provider errors back off and retry.
    pub async fn poll_video_job<F>(
        &self,
        job_id: &str,
        task_id: &str,
        mut on_update: F,
    ) -> Result<Job, VjobsError>
    where
        F: FnMut(&Job),
    {
        loop {
            let job = self.manager.get(job_id).await?;
            on_update(&job);

            match job.status {
                JobStatus::Completed => return Ok(job),
                JobStatus::Failed => return Err(failure(&job)),
                JobStatus::Pending | JobStatus::Processing => {}
            }

            match self.poller.poll(job_id, task_id).await {
                Ok(ProviderStatus::Processing) => sleep(self.polling.video_interval()).await,
                Ok(status) => debug!("Task {} for job {} is {:?}", task_id, job_id, status),
                Err(e) if e.is_transient() => {
                    warn!("Polling job {} failed, retrying: {}", job_id, e);
                    sleep(self.polling.transient_backoff()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait for a provider task id to appear on a job.
    ///
    /// Sleeps `interval` before each of at most `max_attempts` fetches.
    pub async fn await_task_id<F>(
        &self,
        job_id: &str,
        mut on_update: F,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<String, VjobsError>
    where
        F: FnMut(&Job),
    {
        for attempt in 1..=max_attempts {
            sleep(interval).await;
            let job = self.manager.get(job_id).await?;
            on_update(&job);

            if job.status == JobStatus::Failed {
                return Err(failure(&job));
            }
            if let Some(task_id) = job.task_id() {
                debug!("Job {} has task {} after {} attempts", job_id, task_id, attempt);
                return Ok(task_id.to_string());
            }
            if job.status == JobStatus::Completed {
                return Err(VjobsError::InvalidInput(format!(
                    "Job {} completed without a provider task id",
                    job_id
                )));
            }
        }

        Err(VjobsError::Timeout {
            attempts: max_attempts,
            message: format!("no provider task id for job {}", job_id),
        })
    }

    pub async fn get_styles<F>(
        &self,
        track_artist: Option<&str>,
        track_name: &str,
        on_update: F,
    ) -> Result<StylesOutput, VjobsError>
    where
        F: FnMut(&Job),
    {
        let input = StylesInput {
            track_artist: track_artist.map(str::to_string),
            track_name: track_name.to_string(),
        };
        self.run(JobType::Styles, encode(&input)?, on_update).await
    }

    pub async fn get_track_info<F>(
        &self,
        track_name: &str,
        style: &str,
        on_update: F,
    ) -> Result<TrackInfoOutput, VjobsError>
    where
        F: FnMut(&Job),
    {
        let input = TrackInfoInput {
            track_name: track_name.to_string(),
            style: style.to_string(),
        };
        self.run(JobType::TrackInfo, encode(&input)?, on_update).await
    }

    pub async fn generate_image<F>(
        &self,
        prompt: &str,
        regenerate: bool,
        on_update: F,
    ) -> Result<ImageOutput, VjobsError>
    where
        F: FnMut(&Job),
    {
        let input = ImageInput {
            prompt: prompt.to_string(),
            regenerate,
        };
        self.run(JobType::Image, encode(&input)?, on_update).await
    }

    /// Submit a video job, wait for its task id, then follow the provider task
    pub async fn generate_video<F>(&self, input: &VideoInput, mut on_update: F) -> Result<VideoOutput, VjobsError>
    where
        F: FnMut(&Job),
    {
        let id = self.submit(JobType::Video, encode(input)?).await?;
        let task_id = self
            .await_task_id(
                &id,
                &mut on_update,
                self.polling.task_id_max_attempts,
                self.polling.task_id_interval(),
            )
            .await?;
        info!("Video job {} submitted as task {}", id, task_id);

        let job = self.poll_video_job(&id, &task_id, &mut on_update).await?;
        output_of(&job)
    }

    async fn run<T, F>(&self, job_type: JobType, input: Value, on_update: F) -> Result<T, VjobsError>
    where
        T: DeserializeOwned,
        F: FnMut(&Job),
    {
        let id = self.submit(job_type, input).await?;
        let job = self.poll_job(&id, on_update).await?;
        output_of(&job)
    }
}

fn failure(job: &Job) -> VjobsError {
    VjobsError::JobFailed(
        job.error_message
            .clone()
            .unwrap_or_else(|| "Job failed".to_string()),
    )
}

fn encode<T: serde::Serialize>(input: &T) -> Result<Value, VjobsError> {
    serde_json::to_value(input).map_err(|e| VjobsError::InvalidInput(e.to_string()))
}

fn output_of<T: DeserializeOwned>(job: &Job) -> Result<T, VjobsError> {
    let output = job.output_data.clone().ok_or_else(|| {
        GeneratorError::new(format!("Job {} completed without output", job.id))
    })?;
    serde_json::from_value(output).map_err(|e| {
        VjobsError::Generator(GeneratorError::new(format!(
            "Unexpected {} output for job {}: {}",
            job.job_type, job.id, e
        )))
    })
}
