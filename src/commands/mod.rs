pub mod generate;
pub mod init;
pub mod poll;
pub mod process;
pub mod status;
pub mod submit;

pub use generate::*;
pub use init::*;
pub use poll::*;
pub use process::*;
pub use status::*;
pub use submit::*;

use std::path::Path;

use crate::core::{load_config, open_store, ConfigOverrides, GeneratorRegistry, JobClient, JobManager};
use crate::error::VjobsError;
use crate::models::{Job, JobStatus};

/// Build a client over the project's file store with the production providers
pub(crate) fn open_client(project_root: &Path, overrides: ConfigOverrides) -> Result<JobClient, VjobsError> {
    let config = load_config(project_root, overrides)?;
    let manager = JobManager::shared(open_store(project_root, &config)?);
    let registry = GeneratorRegistry::from_config(&config);
    Ok(JobClient::new(manager, registry, &config))
}

/// Progress callback printing a line whenever the job's status changes
pub(crate) fn progress_printer() -> impl FnMut(&Job) {
    let mut last: Option<JobStatus> = None;
    move |job: &Job| {
        if last != Some(job.status) {
            match job.task_id() {
                Some(task_id) => println!("  {} [{}] task {}", job.id, status_label(job.status), task_id),
                None => println!("  {} [{}]", job.id, status_label(job.status)),
            }
            last = Some(job.status);
        }
    }
}

pub(crate) fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "PENDING",
        JobStatus::Processing => "PROCESSING",
        JobStatus::Completed => "COMPLETED",
        JobStatus::Failed => "FAILED",
    }
}

pub(crate) fn print_output(job: &Job) {
    if let Some(output) = &job.output_data {
        match serde_json::to_string_pretty(output) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", output),
        }
    }
}
