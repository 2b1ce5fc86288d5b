use std::path::Path;

use crate::commands::poll::report;
use crate::commands::open_client;
use crate::core::ConfigOverrides;
use crate::error::VjobsError;

/// Run the processor for a single job in the foreground
pub async fn process_job(
    project_root: &Path,
    overrides: ConfigOverrides,
    job_id: &str,
) -> Result<(), VjobsError> {
    let client = open_client(project_root, overrides)?;
    let result = client.processor().process(job_id).await;
    client.shutdown().await;

    let job = result?;
    if let Some(task_id) = job.task_id().filter(|_| !job.status.is_terminal()) {
        println!("Submitted to provider as task {}; run 'vjobs poll {}' to follow it", task_id, job.id);
    }
    if let Some(error) = &job.error_message {
        println!("Error: {}", error);
    }
    report(job);
    Ok(())
}
