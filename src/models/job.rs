use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::models::JobStatus;

/// Kind of work a job performs; selects the generator that processes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum JobType {
    /// Five visual style labels for a track
    #[serde(rename = "styles", alias = "get-styles")]
    Styles,
    /// Tempo and song phases for a track
    #[serde(rename = "track-info", alias = "get-track-info")]
    #[value(name = "track-info")]
    TrackInfo,
    /// Still image rendered from a prompt
    #[serde(rename = "image", alias = "generate-image")]
    Image,
    /// Image-to-video render on an asynchronous provider
    #[serde(rename = "video", alias = "generate-video")]
    Video,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::Styles,
        JobType::TrackInfo,
        JobType::Image,
        JobType::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Styles => "styles",
            JobType::TrackInfo => "track-info",
            JobType::Image => "image",
            JobType::Video => "video",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = JobValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "styles" | "get-styles" => Ok(JobType::Styles),
            "track-info" | "get-track-info" => Ok(JobType::TrackInfo),
            "image" | "generate-image" => Ok(JobType::Image),
            "video" | "generate-video" => Ok(JobType::Video),
            other => Err(JobValidationError::UnknownJobType(other.to_string())),
        }
    }
}

/// A unit of asynchronous work, as seen at the wire boundary (camelCase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Opaque unique identifier, assigned at creation
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    /// Request payload, immutable after creation
    pub input_data: Value,
    /// Generator result; for video jobs first provisional, then final
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    /// Present only when status is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stamped exactly once, on the transition into a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new job in pending status
    pub fn new(id: String, job_type: JobType, input_data: Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_type,
            status: JobStatus::Pending,
            input_data,
            output_data: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Provider task id carried by a provisional or final video output
    pub fn task_id(&self) -> Option<&str> {
        self.output_field("taskId")
    }

    /// Playable media URL of a finished video job
    pub fn video_url(&self) -> Option<&str> {
        self.output_field("videoUrl")
    }

    fn output_field(&self, key: &str) -> Option<&str> {
        self.output_data
            .as_ref()
            .and_then(|o| o.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Partial update applied through the job manager; only supplied fields change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Final result: status completed with the given output
    pub fn completed(output: Value) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            output_data: Some(output),
            error_message: None,
        }
    }

    /// Provisional result: output written while the job stays processing
    pub fn provisional(output: Value) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            output_data: Some(output),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            output_data: None,
            error_message: Some(message.into()),
        }
    }
}

/// Errors raised while validating a job request before it is created
#[derive(Debug, thiserror::Error)]
pub enum JobValidationError {
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("inputData is required for {0} jobs")]
    MissingInput(JobType),

    #[error("inputData for {job_type} jobs must be an object")]
    NotAnObject { job_type: JobType },

    #[error("inputData.{field} is required for {job_type} jobs")]
    MissingField { job_type: JobType, field: &'static str },

    #[error("inputData for {job_type} jobs is malformed: {message}")]
    Malformed { job_type: JobType, message: String },
}
