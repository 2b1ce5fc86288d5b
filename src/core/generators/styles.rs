use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::generators::Generator;
use crate::core::parser::parse_reply;
use crate::core::prompts::{styles_prompt, SYSTEM_PROMPT_STYLES};
use crate::core::providers::{ChatRequest, LanguageModel};
use crate::error::GeneratorError;
use crate::models::{decode, JobType, StylesInput, StylesOutput, SENTINEL_STYLE, STYLE_COUNT};

/// Suggests visual styles for a track; the last style is always the sentinel
pub struct StylesGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl StylesGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

/// Keep the first four distinct non-sentinel labels and append the sentinel
pub fn finalize_styles(suggested: Vec<String>) -> Result<Vec<String>, GeneratorError> {
    let wanted = STYLE_COUNT - 1;
    let mut styles: Vec<String> = Vec::with_capacity(STYLE_COUNT);

    for style in suggested {
        let style = style.trim();
        if style.is_empty() || style.eq_ignore_ascii_case(SENTINEL_STYLE) {
            continue;
        }
        if styles.iter().any(|s| s.eq_ignore_ascii_case(style)) {
            continue;
        }
        styles.push(style.to_string());
        if styles.len() == wanted {
            break;
        }
    }

    if styles.len() < wanted {
        return Err(GeneratorError::new(format!(
            "Expected {} styles from the model, got {}",
            wanted,
            styles.len()
        )));
    }

    styles.push(SENTINEL_STYLE.to_string());
    Ok(styles)
}

#[async_trait]
impl Generator for StylesGenerator {
    fn job_type(&self) -> JobType {
        JobType::Styles
    }

    async fn generate(&self, input: &Value) -> Result<Value, GeneratorError> {
        let input: StylesInput = decode(JobType::Styles, input)?;

        let request = ChatRequest::new(
            SYSTEM_PROMPT_STYLES,
            styles_prompt(input.track_artist.as_deref(), &input.track_name),
        )
        .temperature(0.8)
        .max_tokens(200);

        let reply = self.llm.complete(&request).await?;
        let suggested: Vec<String> = parse_reply("styles", &reply)?;
        if suggested.iter().any(|s| s.trim().eq_ignore_ascii_case(SENTINEL_STYLE)) {
            debug!("Model included the sentinel style; it is re-added in fixed position");
        }

        let styles = finalize_styles(suggested).map_err(|e| {
            warn!("Styles for '{}' rejected: {}", input.track_name, e);
            e
        })?;

        serde_json::to_value(StylesOutput { styles })
            .map_err(|e| GeneratorError::new(format!("Failed to encode styles: {}", e)))
    }
}
