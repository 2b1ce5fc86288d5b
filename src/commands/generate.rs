use std::path::Path;

use crate::commands::{open_client, progress_printer};
use crate::core::ConfigOverrides;
use crate::error::VjobsError;
use crate::models::VideoInput;

/// One-shot generation request from the command line
#[derive(Debug, Clone)]
pub enum GenerateRequest {
    Styles {
        artist: Option<String>,
        track: String,
    },
    TrackInfo {
        track: String,
        style: String,
    },
    Image {
        prompt: String,
        regenerate: bool,
    },
    Video(VideoInput),
}

/// Run a generation workflow end to end and print the result
pub async fn run_generate(
    project_root: &Path,
    overrides: ConfigOverrides,
    request: GenerateRequest,
) -> Result<(), VjobsError> {
    let client = open_client(project_root, overrides)?;
    let on_update = progress_printer();

    let result = match &request {
        GenerateRequest::Styles { artist, track } => client
            .get_styles(artist.as_deref(), track, on_update)
            .await
            .map(|output| {
                println!("\nStyles for \"{}\":", track);
                for (i, style) in output.styles.iter().enumerate() {
                    println!("  {}. {}", i + 1, style);
                }
            }),
        GenerateRequest::TrackInfo { track, style } => client
            .get_track_info(track, style, on_update)
            .await
            .map(|output| {
                let phases: Vec<&str> = output.phases.iter().map(|p| p.as_str()).collect();
                println!("\nTrack \"{}\": {} BPM", track, output.bpm);
                println!("Phases: {}", phases.join(" -> "));
            }),
        GenerateRequest::Image { prompt, regenerate } => client
            .generate_image(prompt, *regenerate, on_update)
            .await
            .map(|output| {
                println!("\nImage:    {}", output.image_url);
                println!("Model:    {}", output.model_used);
                println!("Prompt:   {}", output.revised_prompt);
            }),
        GenerateRequest::Video(input) => client.generate_video(input, on_update).await.map(|output| {
            println!("\nTask:     {}", output.task_id);
            if let Some(url) = &output.video_url {
                println!("Video:    {}", url);
            }
            println!("Prompt:   {}", output.video_prompt);
        }),
    };

    client.shutdown().await;
    result
}
