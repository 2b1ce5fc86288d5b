use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::core::generators::Generator;
use crate::core::parser::parse_reply;
use crate::core::prompts::{track_info_prompt, SYSTEM_PROMPT_TRACK_INFO};
use crate::core::providers::{ChatRequest, LanguageModel};
use crate::error::GeneratorError;
use crate::models::{decode, JobType, Phase, TrackInfoInput, TrackInfoOutput};

pub const MIN_BPM: f64 = 60.0;
pub const MAX_BPM: f64 = 200.0;

/// Estimates tempo and song phases for a track
pub struct TrackInfoGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl TrackInfoGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

/// Raw model answer, before normalization
#[derive(Debug, Deserialize)]
struct TrackInfoReply {
    bpm: f64,
    #[serde(default)]
    phases: Vec<String>,
}

fn normalize(reply: TrackInfoReply) -> Result<TrackInfoOutput, GeneratorError> {
    if !reply.bpm.is_finite() {
        return Err(GeneratorError::new("Model returned a non-numeric bpm"));
    }
    let clamped = reply.bpm.clamp(MIN_BPM, MAX_BPM);
    if clamped != reply.bpm {
        warn!("bpm {} outside {}-{}, clamped to {}", reply.bpm, MIN_BPM, MAX_BPM, clamped);
    }

    let mut phases = Vec::with_capacity(reply.phases.len());
    for name in &reply.phases {
        match Phase::parse(name) {
            Some(phase) => phases.push(phase),
            None => warn!("Dropping unknown phase '{}'", name),
        }
    }
    if phases.is_empty() {
        return Err(GeneratorError::new("Model returned no recognizable song phases"));
    }

    Ok(TrackInfoOutput { bpm: clamped.round() as u32, phases })
}

#[async_trait]
impl Generator for TrackInfoGenerator {
    fn job_type(&self) -> JobType {
        JobType::TrackInfo
    }

    async fn generate(&self, input: &Value) -> Result<Value, GeneratorError> {
        let input: TrackInfoInput = decode(JobType::TrackInfo, input)?;

        let request = ChatRequest::new(
            SYSTEM_PROMPT_TRACK_INFO,
            track_info_prompt(&input.track_name, &input.style),
        )
        .temperature(0.3)
        .max_tokens(200);

        let reply = self.llm.complete(&request).await?;
        let output = normalize(parse_reply("track info", &reply)?)?;

        serde_json::to_value(output)
            .map_err(|e| GeneratorError::new(format!("Failed to encode track info: {}", e)))
    }
}
