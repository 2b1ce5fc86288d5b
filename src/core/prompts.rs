//! System prompts and user-message builders for the LLM calls
//!
//! The system prompt fixes the model's role; the user message carries the
//! track- or image-specific details.

use crate::models::{VideoInput, SENTINEL_STYLE};

/// System prompt for style suggestions
pub const SYSTEM_PROMPT_STYLES: &str = "You are a creative visual artist specializing in DJ performance visuals. Always respond with valid JSON arrays.";

/// System prompt for track analysis
pub const SYSTEM_PROMPT_TRACK_INFO: &str = "You are a music expert specializing in electronic and dance music. Always respond with valid JSON.";

/// System prompt for image prompt enhancement
pub const SYSTEM_PROMPT_IMAGE: &str = r#"You are an expert at creating detailed image prompts for AI art generation. Enhance the given prompt with rich visual details, lighting, composition, and artistic style while keeping it under 1000 characters.
IMPORTANT: Do not include any DJs, stages, performers, or people in the visual. Focus on abstract visuals, colors, patterns, and atmospheric elements that would work as background visuals."#;

/// System prompt for video motion prompts
pub const SYSTEM_PROMPT_VIDEO: &str = r#"You are an expert at creating prompts for AI video generation. Create a prompt that describes motion and animation for abstract background visuals.
IMPORTANT: Do not include any DJs, stages, performers, or people in the visual. Focus on abstract motion, colors, patterns, and atmospheric elements."#;

pub fn styles_prompt(track_artist: Option<&str>, track_name: &str) -> String {
    let by = track_artist
        .filter(|a| !a.trim().is_empty())
        .map(|a| format!(" by {}", a))
        .unwrap_or_default();
    format!(
        r#"You are helping a DJ create stunning visuals for their set.
Given the track "{track}"{by}, suggest 4 unique and creative visual styles.
Each style should be visually distinct and suitable for live DJ performance visuals.
Do not suggest "{sentinel}"; it is always offered separately.

Return only a JSON array of 4 style names, each 3-5 words long.
Example: ["Cyberpunk Neon Dreams", "Abstract Geometric Patterns", "Ethereal Space Journey", "Psychedelic Color Waves"]"#,
        track = track_name,
        by = by,
        sentinel = SENTINEL_STYLE,
    )
}

pub fn track_info_prompt(track_name: &str, style: &str) -> String {
    format!(
        r#"Analyze the track "{track}" (visual style: {style}) and provide:
1. The estimated BPM (beats per minute) - provide a single number between 60-200
2. The song phases present in typical electronic/dance music

Return a JSON object with:
- bpm: number
- phases: array of phase names drawn from: intro, buildup, drop, breakdown, outro

Example: {{"bpm": 128, "phases": ["intro", "buildup", "drop", "breakdown", "outro"]}}"#,
        track = track_name,
        style = style,
    )
}

pub fn image_prompt(prompt: &str) -> String {
    format!(
        "Enhance this prompt for a background visual (no people, no DJ, no stage): {}",
        prompt
    )
}

pub fn video_prompt(input: &VideoInput) -> String {
    let or_unknown = |v: Option<&str>| v.filter(|s| !s.is_empty()).unwrap_or("unknown").to_string();
    let bpm = input
        .bpm
        .map(|b| format!("{}", b.round()))
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        r#"Create a video generation prompt for this abstract background visual (no people, no DJ, no stage):
Track: {track}
BPM: {bpm}
Phase: {phase}
Style: {style}
Base description: {base}

Focus on abstract motion, rhythm, and dynamic visual elements that sync with the music tempo."#,
        track = or_unknown(input.track_name.as_deref()),
        bpm = bpm,
        phase = or_unknown(input.phase.as_deref()),
        style = or_unknown(input.style.as_deref()),
        base = input.prompt,
    )
}
