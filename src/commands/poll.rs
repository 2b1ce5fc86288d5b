use std::path::Path;
use tracing::info;

use crate::commands::{open_client, print_output, progress_printer, status_label};
use crate::core::{ConfigOverrides, GeneratorMode, JobClient};
use crate::error::VjobsError;
use crate::models::{Job, JobStatus};

/// Wait for a job to finish, printing progress and its output
pub async fn poll_existing_job(
    project_root: &Path,
    overrides: ConfigOverrides,
    job_id: &str,
) -> Result<(), VjobsError> {
    let client = open_client(project_root, overrides)?;

    let job = client.manager().get(job_id).await?;
    if job.status == JobStatus::Pending {
        info!("Job {} is still pending, processing it now", job_id);
        let processed = client.processor().process(job_id).await?;
        info!("Job {} is now {}", job_id, processed.status);
    }

    let result = wait_for_job(&client, job_id).await;
    client.shutdown().await;
    report(result?);
    Ok(())
}

/// Poll a job to a terminal status, switching to provider polling for video
pub async fn wait_for_job(client: &JobClient, job_id: &str) -> Result<Job, VjobsError> {
    let job = client.manager().get(job_id).await?;
    let mut on_update = progress_printer();

    if client.mode(job.job_type) == GeneratorMode::Synchronous {
        return client.poll_job(job_id, &mut on_update).await;
    }

    let task_id = match job.task_id() {
        Some(task_id) => task_id.to_string(),
        None if job.status.is_terminal() => return client.poll_job(job_id, &mut on_update).await,
        None => {
            client
                .await_task_id(
                    job_id,
                    &mut on_update,
                    client.polling().task_id_max_attempts,
                    client.polling().task_id_interval(),
                )
                .await?
        }
    };
    client.poll_video_job(job_id, &task_id, &mut on_update).await
}

pub(crate) fn report(job: Job) {
    println!("\nJob {} [{}]", job.id, status_label(job.status));
    print_output(&job);
}
