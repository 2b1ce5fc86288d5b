use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commands::poll::{report, wait_for_job};
use crate::commands::open_client;
use crate::core::ConfigOverrides;
use crate::error::VjobsError;
use crate::models::JobType;

/// Submit options
pub struct SubmitOptions {
    pub job_type: JobType,
    /// Inline JSON input
    pub input: Option<String>,
    /// JSON or YAML file holding the input
    pub input_file: Option<PathBuf>,
    /// Poll the job until it finishes
    pub wait: bool,
}

/// Create a job, dispatch it, and optionally wait for the result
pub async fn submit_job(
    project_root: &Path,
    overrides: ConfigOverrides,
    options: SubmitOptions,
) -> Result<(), VjobsError> {
    let input = read_input(options.input.as_deref(), options.input_file.as_deref())?;
    let client = open_client(project_root, overrides)?;

    let id = client.submit(options.job_type, input).await?;
    info!("Submitted {} job {}", options.job_type, id);
    println!("{}", id);

    if !options.wait {
        client.shutdown().await;
        return Ok(());
    }

    let result = wait_for_job(&client, &id).await;
    client.shutdown().await;
    report(result?);
    Ok(())
}

/// Parse job input from inline JSON or a `.json`/`.yaml`/`.yml` file
pub fn read_input(inline: Option<&str>, file: Option<&Path>) -> Result<Value, VjobsError> {
    match (inline, file) {
        (Some(_), Some(_)) => Err(VjobsError::InvalidInput(
            "use either --input or --input-file, not both".to_string(),
        )),
        (None, None) => Err(VjobsError::InvalidInput(
            "job input is required (--input or --input-file)".to_string(),
        )),
        (Some(json), None) => serde_json::from_str(json)
            .map_err(|e| VjobsError::InvalidInput(format!("input is not valid JSON: {}", e))),
        (None, Some(path)) => {
            let content = fs::read_to_string(path)?;
            let is_yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            );
            if is_yaml {
                serde_yaml::from_str(&content).map_err(|e| {
                    VjobsError::InvalidInput(format!("{} is not valid YAML: {}", path.display(), e))
                })
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    VjobsError::InvalidInput(format!("{} is not valid JSON: {}", path.display(), e))
                })
            }
        }
    }
}
