//! Typed input and output payloads for each job type.
//!
//! Jobs store their payloads as opaque JSON; generators and the client
//! convert through these types at the edges.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::models::{JobType, JobValidationError};

/// The fixed fifth style offered for every track
pub const SENTINEL_STYLE: &str = "Rainbow Vomit";

/// Number of style labels a styles job returns, sentinel included
pub const STYLE_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylesInput {
    #[serde(default)]
    pub track_artist: Option<String>,
    pub track_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylesOutput {
    pub styles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfoInput {
    pub track_name: String,
    pub style: String,
}

/// Section of an electronic/dance track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Intro,
    Buildup,
    Drop,
    Breakdown,
    Outro,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Intro,
        Phase::Buildup,
        Phase::Drop,
        Phase::Breakdown,
        Phase::Outro,
    ];

    /// Parse a phase name leniently ("Build-up", " DROP ")
    pub fn parse(name: &str) -> Option<Phase> {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "intro" => Some(Phase::Intro),
            "buildup" => Some(Phase::Buildup),
            "drop" => Some(Phase::Drop),
            "breakdown" => Some(Phase::Breakdown),
            "outro" => Some(Phase::Outro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Intro => "intro",
            Phase::Buildup => "buildup",
            Phase::Drop => "drop",
            Phase::Breakdown => "breakdown",
            Phase::Outro => "outro",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfoOutput {
    pub bpm: u32,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub prompt: String,
    /// Caller already supplies a final prompt; skip enhancement
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOutput {
    pub image_url: String,
    pub enhanced_prompt: String,
    pub revised_prompt: String,
    /// Backend model that satisfied the request
    pub model_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInput {
    pub image_url: String,
    pub prompt: String,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub bpm: Option<f64>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoState {
    Processing,
    Completed,
}

/// Video output: provisional (task id only) or final (with `video_url`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOutput {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub status: VideoState,
    pub video_prompt: String,
}

impl VideoOutput {
    pub fn provisional(task_id: String, video_prompt: String) -> Self {
        Self {
            task_id,
            video_url: None,
            status: VideoState::Processing,
            video_prompt,
        }
    }

    pub fn finished(task_id: String, video_url: String, video_prompt: String) -> Self {
        Self {
            task_id,
            video_url: Some(video_url),
            status: VideoState::Completed,
            video_prompt,
        }
    }
}

/// Decode an opaque payload into its typed form
pub fn decode<T: DeserializeOwned>(job_type: JobType, value: &Value) -> Result<T, JobValidationError> {
    serde_json::from_value(value.clone()).map_err(|e| JobValidationError::Malformed {
        job_type,
        message: e.to_string(),
    })
}

/// Check a job's input payload before the job is created
pub fn validate_input(job_type: JobType, input: &Value) -> Result<(), JobValidationError> {
    let object = match input {
        Value::Null => return Err(JobValidationError::MissingInput(job_type)),
        Value::Object(map) => map,
        _ => return Err(JobValidationError::NotAnObject { job_type }),
    };

    let required: &[&'static str] = match job_type {
        JobType::Styles => &["trackName"],
        JobType::TrackInfo => &["trackName", "style"],
        JobType::Image => &["prompt"],
        JobType::Video => &["imageUrl", "prompt"],
    };

    for field in required {
        let present = object
            .get(*field)
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if !present {
            return Err(JobValidationError::MissingField { job_type, field });
        }
    }

    match job_type {
        JobType::Styles => decode::<StylesInput>(job_type, input).map(|_| ()),
        JobType::TrackInfo => decode::<TrackInfoInput>(job_type, input).map(|_| ()),
        JobType::Image => decode::<ImageInput>(job_type, input).map(|_| ()),
        JobType::Video => decode::<VideoInput>(job_type, input).map(|_| ()),
    }
}
