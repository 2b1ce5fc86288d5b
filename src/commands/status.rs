use std::path::Path;

use crate::commands::{print_output, status_label};
use crate::core::{load_config, open_store, ConfigOverrides, JobManager};
use crate::error::VjobsError;
use crate::models::Job;

/// Show one job, or a summary of every job in the store
pub async fn show_status(
    project_root: &Path,
    overrides: ConfigOverrides,
    job_id: Option<&str>,
    verbose: bool,
) -> Result<(), VjobsError> {
    let config = load_config(project_root, overrides)?;
    let manager = JobManager::new(open_store(project_root, &config)?);

    if let Some(id) = job_id {
        let job = manager.get(id).await?;
        print_job(&job, verbose);
        return Ok(());
    }

    let summary = manager.summary().await?;
    println!("=== vjobs Status ===\n");
    println!("{}", summary);
    println!();

    if verbose {
        let jobs = manager.list().await?;
        if jobs.is_empty() {
            println!("No jobs found.");
        } else {
            println!("Jobs:");
            for job in &jobs {
                print!("  {} {} [{}]", job.id, job.job_type, status_label(job.status));
                if let Some(ref error) = job.error_message {
                    print!(" - {}", error);
                }
                println!();
            }
        }
    }

    let waiting = manager
        .list()
        .await?
        .into_iter()
        .filter(|j| !j.status.is_terminal() && j.task_id().is_some())
        .count();
    if waiting > 0 {
        println!("\nNote: {} video job(s) are waiting on their provider", waiting);
        println!("Use 'vjobs poll <job_id>' to follow one to completion");
    }

    Ok(())
}

fn print_job(job: &Job, verbose: bool) {
    println!("Job:       {}", job.id);
    println!("Type:      {}", job.job_type);
    println!("Status:    {}", status_label(job.status));
    println!("Created:   {}", job.created_at.to_rfc3339());
    println!("Updated:   {}", job.updated_at.to_rfc3339());
    if let Some(completed) = job.completed_at {
        println!("Completed: {}", completed.to_rfc3339());
    }
    if let Some(task_id) = job.task_id() {
        println!("Task:      {}", task_id);
    }
    if let Some(ref error) = job.error_message {
        println!("Error:     {}", error);
    }
    if verbose {
        println!("\nInput:");
        match serde_json::to_string_pretty(&job.input_data) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", job.input_data),
        }
        if job.output_data.is_some() {
            println!("\nOutput:");
            print_output(job);
        }
    }
}
