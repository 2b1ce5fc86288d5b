use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vjobs::commands::{
    init_project, poll_existing_job, process_job, run_generate, show_status, submit_job,
    GenerateRequest, SubmitOptions,
};
use vjobs::core::ConfigOverrides;
use vjobs::models::{JobType, VideoInput};

/// vjobs - asynchronous generation jobs for DJ visuals
#[derive(Parser)]
#[command(name = "vjobs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (debug logs, full job details in status)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to vjobs.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the OpenAI base URL
    #[arg(long, global = true)]
    openai_url: Option<String>,

    /// Override the Runway base URL
    #[arg(long, global = true)]
    runway_url: Option<String>,

    /// Override the per-generator timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vjobs project
    Init {
        /// Project directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Create a job and dispatch it
    Submit {
        /// Job type
        #[arg(long = "type", short = 't', value_enum)]
        job_type: JobType,

        /// Job input as inline JSON
        #[arg(long, short = 'i')]
        input: Option<String>,

        /// Job input from a JSON or YAML file
        #[arg(long, short = 'f')]
        input_file: Option<PathBuf>,

        /// Wait for the job to finish
        #[arg(long, short = 'w')]
        wait: bool,
    },

    /// Process one job in the foreground
    Process {
        /// Job ID
        id: String,
    },

    /// Wait for a job to finish
    Poll {
        /// Job ID
        id: String,
    },

    /// Show job status
    Status {
        /// Show a single job
        id: Option<String>,
    },

    /// Run a generation workflow and wait for its result
    Generate {
        #[command(subcommand)]
        kind: GenerateKind,
    },
}

#[derive(Subcommand)]
enum GenerateKind {
    /// Suggest visual styles for a track
    Styles {
        #[arg(long)]
        track: String,
        #[arg(long)]
        artist: Option<String>,
    },

    /// Estimate BPM and song phases
    TrackInfo {
        #[arg(long)]
        track: String,
        #[arg(long)]
        style: String,
    },

    /// Render a background image
    Image {
        #[arg(long)]
        prompt: String,

        /// Use the prompt as given, without enhancement
        #[arg(long)]
        regenerate: bool,
    },

    /// Animate an image into a video clip
    Video {
        #[arg(long)]
        image_url: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        track: Option<String>,
        #[arg(long)]
        bpm: Option<f64>,
        #[arg(long)]
        phase: Option<String>,
        #[arg(long)]
        style: Option<String>,
    },
}

impl From<GenerateKind> for GenerateRequest {
    fn from(kind: GenerateKind) -> Self {
        match kind {
            GenerateKind::Styles { track, artist } => GenerateRequest::Styles { artist, track },
            GenerateKind::TrackInfo { track, style } => GenerateRequest::TrackInfo { track, style },
            GenerateKind::Image { prompt, regenerate } => GenerateRequest::Image { prompt, regenerate },
            GenerateKind::Video {
                image_url,
                prompt,
                track,
                bpm,
                phase,
                style,
            } => GenerateRequest::Video(VideoInput {
                image_url,
                prompt,
                track_name: track,
                bpm,
                phase,
                style,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let builder = FmtSubscriber::builder().with_target(false).without_time();
    if cli.verbose {
        builder.with_max_level(Level::DEBUG).init();
    } else {
        builder
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    }

    let current_dir = std::env::current_dir().context("Failed to determine the current directory")?;
    let overrides = ConfigOverrides {
        config_path: cli.config,
        openai_url: cli.openai_url,
        runway_url: cli.runway_url,
        timeout: cli.timeout,
    };

    match cli.command {
        Commands::Init { path } => {
            let project_root = path.unwrap_or(current_dir);
            init_project(&project_root).context("Failed to initialize project")?;
        }

        Commands::Submit {
            job_type,
            input,
            input_file,
            wait,
        } => {
            let options = SubmitOptions {
                job_type,
                input,
                input_file,
                wait,
            };
            submit_job(&current_dir, overrides, options).await?;
        }

        Commands::Process { id } => process_job(&current_dir, overrides, &id).await?,

        Commands::Poll { id } => poll_existing_job(&current_dir, overrides, &id).await?,

        Commands::Status { id } => {
            show_status(&current_dir, overrides, id.as_deref(), cli.verbose).await?
        }

        Commands::Generate { kind } => run_generate(&current_dir, overrides, kind.into()).await?,
    }

    Ok(())
}
