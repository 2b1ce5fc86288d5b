use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::core::generators::{GeneratorMode, GeneratorRegistry};
use crate::core::manager::JobManager;
use crate::error::VjobsError;
use crate::models::{Job, JobStatus, JobUpdate};

/// Runs one job through its generator and records the outcome.
///
/// Generator failures never escape `process`; they are written to the job
/// as `failed`. Only lookup and store errors are returned to the caller.
pub struct JobProcessor {
    manager: Arc<JobManager>,
    registry: Arc<GeneratorRegistry>,
    timeout: Duration,
    in_flight: Mutex<HashSet<String>>,
}

/// Marks a job as running in this processor until dropped
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    job_id: String,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<String>>, job_id: &str) -> Option<Self> {
        let mut ids = set.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(job_id.to_string()) {
            return None;
        }
        Some(Self {
            set,
            job_id: job_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut ids = self.set.lock().unwrap_or_else(|e| e.into_inner());
        ids.remove(&self.job_id);
    }
}

impl JobProcessor {
    pub fn new(manager: Arc<JobManager>, registry: Arc<GeneratorRegistry>, timeout: Duration) -> Self {
        Self {
            manager,
            registry,
            timeout,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn manager(&self) -> &Arc<JobManager> {
        &self.manager
    }

    /// Process a job by id and return it as last written.
    ///
    /// Terminal jobs, video jobs already handed to their provider, and jobs
    /// this processor is already running are returned untouched.
    pub async fn process(&self, job_id: &str) -> Result<Job, VjobsError> {
        let Some(_claim) = InFlight::claim(&self.in_flight, job_id) else {
            debug!("Job {} is already being processed, skipping duplicate dispatch", job_id);
            return self.manager.get(job_id).await;
        };

        let job = self.manager.get(job_id).await?;

        if job.status.is_terminal() {
            debug!("Job {} already {}, nothing to do", job_id, job.status);
            return Ok(job);
        }
        if job.status == JobStatus::Processing && job.task_id().is_some() {
            debug!("Job {} already submitted to its provider", job_id);
            return Ok(job);
        }
        if job.status == JobStatus::Processing {
            warn!("Job {} was left processing, running it again", job_id);
        }

        let job = match self.manager.update(job_id, JobUpdate::status(JobStatus::Processing)).await {
            Ok(job) => job,
            Err(VjobsError::InvalidTransition { .. }) => return self.manager.get(job_id).await,
            Err(e) => return Err(e),
        };

        let Some(generator) = self.registry.generator(job.job_type) else {
            error!("No generator registered for {} (job {})", job.job_type, job_id);
            return self
                .record(job_id, JobUpdate::failed(format!("Unknown job type: {}", job.job_type)))
                .await;
        };

        info!("Processing {} job {}", job.job_type, job_id);
        let update = match tokio::time::timeout(self.timeout, generator.generate(&job.input_data)).await {
            Ok(Ok(output)) => match generator.mode() {
                GeneratorMode::Synchronous => JobUpdate::completed(output),
                GeneratorMode::ProviderAsync => JobUpdate::provisional(output),
            },
            Ok(Err(e)) => {
                warn!("Job {} failed: {}", job_id, e);
                JobUpdate::failed(e.message())
            }
            Err(_) => {
                warn!("Job {} timed out after {:?}", job_id, self.timeout);
                JobUpdate::failed(format!(
                    "Generator timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        };

        let job = self.record(job_id, update).await?;
        info!("Job {} is now {}", job_id, job.status);
        Ok(job)
    }

    /// Write an outcome; if another writer already finished the job, keep theirs
    async fn record(&self, job_id: &str, update: JobUpdate) -> Result<Job, VjobsError> {
        match self.manager.update(job_id, update).await {
            Ok(job) => Ok(job),
            Err(VjobsError::InvalidTransition { from, .. }) => {
                warn!("Job {} was finished elsewhere ({}), keeping that outcome", job_id, from);
                self.manager.get(job_id).await
            }
            Err(VjobsError::TaskConflict { existing, .. }) => {
                warn!("Job {} already bound to task {}, keeping it", job_id, existing);
                self.manager.get(job_id).await
            }
            Err(e) => Err(e),
        }
    }
}
