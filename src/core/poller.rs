use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::generators::GeneratorRegistry;
use crate::core::manager::JobManager;
use crate::core::providers::TaskState;
use crate::error::{ProviderError, VjobsError};
use crate::models::{Job, JobUpdate, ProviderStatus, VideoOutput};

/// Finishes provider-async jobs by querying the provider for their task.
///
/// Only terminal provider states are written; a running task or a transport
/// failure leaves the job untouched.
pub struct ExternalTaskPoller {
    manager: Arc<JobManager>,
    registry: Arc<GeneratorRegistry>,
}

/// Errors worth retrying later: the provider may simply be unreachable
fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::HttpError { status, .. } => *status == 429 || *status >= 500,
        other => other.is_transport(),
    }
}

impl ExternalTaskPoller {
    pub fn new(manager: Arc<JobManager>, registry: Arc<GeneratorRegistry>) -> Self {
        Self { manager, registry }
    }

    pub async fn poll(&self, job_id: &str, task_id: &str) -> Result<ProviderStatus, VjobsError> {
        let job = self.manager.get(job_id).await?;

        if job.status.is_terminal() {
            debug!("Job {} already {}, provider not queried", job_id, job.status);
            return Ok(job.status.into());
        }

        match job.task_id() {
            Some(recorded) if recorded == task_id => {}
            Some(recorded) => {
                return Err(VjobsError::InvalidInput(format!(
                    "Task {} does not belong to job {} (recorded task: {})",
                    task_id, job_id, recorded
                )))
            }
            None => {
                return Err(VjobsError::InvalidInput(format!(
                    "Job {} has no provider task yet",
                    job_id
                )))
            }
        }

        let provider = self.registry.task_provider(job.job_type).ok_or_else(|| {
            VjobsError::InvalidInput(format!("No task provider for {} jobs", job.job_type))
        })?;

        let task = match provider.task_status(task_id).await {
            Ok(task) => task,
            Err(e) if is_retryable(&e) => {
                warn!(job_id, task_id, "Provider unreachable, will retry: {}", e);
                return Err(VjobsError::Transient(e.to_string()));
            }
            Err(e) => return Err(VjobsError::Generator(e.into())),
        };
        debug!(job_id, task_id, status = %task.raw_status, "Provider task polled");

        let update = match task.state {
            TaskState::Running => return Ok(ProviderStatus::Processing),
            TaskState::Succeeded => match task.output_url {
                Some(url) => {
                    let output = VideoOutput::finished(task_id.to_string(), url, video_prompt(&job));
                    let output = serde_json::to_value(output).map_err(|e| {
                        VjobsError::InvalidInput(format!("Failed to encode video output: {}", e))
                    })?;
                    JobUpdate::completed(output)
                }
                None => JobUpdate::failed(format!(
                    "{} task failed: no output URL returned",
                    provider.name()
                )),
            },
            TaskState::Failed => JobUpdate::failed(format!(
                "{} task failed: {}",
                provider.name(),
                task.failure
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string())
            )),
        };

        match self.manager.update(job_id, update).await {
            Ok(job) => {
                info!("Job {} finished by provider: {}", job_id, job.status);
                Ok(job.status.into())
            }
            Err(VjobsError::InvalidTransition { .. }) => {
                let job = self.manager.get(job_id).await?;
                debug!("Job {} was finished by another poller ({})", job_id, job.status);
                Ok(job.status.into())
            }
            Err(e) => Err(e),
        }
    }
}

fn video_prompt(job: &Job) -> String {
    job.output_data
        .as_ref()
        .and_then(|o| o.get("videoPrompt"))
        .and_then(|p| p.as_str())
        .unwrap_or_default()
        .to_string()
}
