use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the config file looked up in the working directory
pub const CONFIG_FILE: &str = "vjobs.toml";

/// Configuration loaded from vjobs.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub runway: RunwayConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// OpenAI API configuration (chat completions and image generation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base API URL
    #[serde(default = "default_openai_url")]
    pub url: String,
    /// API key; filled from OPENAI_API_KEY when absent
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for prompt enhancement and track analysis
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Timeout in seconds for API requests
    #[serde(default = "default_openai_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            url: default_openai_url(),
            api_key: None,
            chat_model: default_chat_model(),
            timeout_seconds: default_openai_timeout(),
        }
    }
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4".to_string()
}

fn default_openai_timeout() -> u64 {
    120
}

/// Image rendering backends, tried in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    #[serde(default = "default_image_size")]
    pub size: String,
    #[serde(default = "default_image_quality")]
    pub quality: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            size: default_image_size(),
            quality: default_image_quality(),
        }
    }
}

fn default_primary_model() -> String {
    "gpt-image-1".to_string()
}

fn default_fallback_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1792x1024".to_string()
}

fn default_image_quality() -> String {
    "hd".to_string()
}

/// Runway image-to-video configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunwayConfig {
    #[serde(default = "default_runway_url")]
    pub url: String,
    /// API key; filled from RUNWAY_API_KEY when absent
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_runway_version")]
    pub api_version: String,
    #[serde(default = "default_runway_model")]
    pub model: String,
    /// Clip length in seconds
    #[serde(default = "default_runway_duration")]
    pub duration: u32,
    #[serde(default = "default_runway_ratio")]
    pub ratio: String,
    #[serde(default = "default_runway_timeout")]
    pub timeout_seconds: u64,
    /// Hard limit on the prompt text the provider accepts
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for RunwayConfig {
    fn default() -> Self {
        Self {
            url: default_runway_url(),
            api_key: None,
            api_version: default_runway_version(),
            model: default_runway_model(),
            duration: default_runway_duration(),
            ratio: default_runway_ratio(),
            timeout_seconds: default_runway_timeout(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_runway_url() -> String {
    "https://api.dev.runwayml.com/v1".to_string()
}

fn default_runway_version() -> String {
    "2024-11-06".to_string()
}

fn default_runway_model() -> String {
    "gen4_turbo".to_string()
}

fn default_runway_duration() -> u32 {
    5
}

fn default_runway_ratio() -> String {
    "1280:720".to_string()
}

fn default_runway_timeout() -> u64 {
    60
}

fn default_max_prompt_chars() -> usize {
    1000
}

/// Cadence of the client poll loops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between job store reads for synchronous job types
    #[serde(default = "default_job_interval")]
    pub job_interval_ms: u64,
    /// Delay between provider polls for video jobs
    #[serde(default = "default_video_interval")]
    pub video_interval_ms: u64,
    /// Delay between reads while waiting for a provider task id
    #[serde(default = "default_task_id_interval")]
    pub task_id_interval_ms: u64,
    /// Reads before giving up on a provider task id
    #[serde(default = "default_task_id_attempts")]
    pub task_id_max_attempts: u32,
    /// Delay after a transient provider error
    #[serde(default = "default_transient_backoff")]
    pub transient_backoff_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            job_interval_ms: default_job_interval(),
            video_interval_ms: default_video_interval(),
            task_id_interval_ms: default_task_id_interval(),
            task_id_max_attempts: default_task_id_attempts(),
            transient_backoff_ms: default_transient_backoff(),
        }
    }
}

impl PollingConfig {
    pub fn job_interval(&self) -> Duration {
        Duration::from_millis(self.job_interval_ms)
    }

    pub fn video_interval(&self) -> Duration {
        Duration::from_millis(self.video_interval_ms)
    }

    pub fn task_id_interval(&self) -> Duration {
        Duration::from_millis(self.task_id_interval_ms)
    }

    pub fn transient_backoff(&self) -> Duration {
        Duration::from_millis(self.transient_backoff_ms)
    }
}

fn default_job_interval() -> u64 {
    2000
}

fn default_video_interval() -> u64 {
    5000
}

fn default_task_id_interval() -> u64 {
    2000
}

fn default_task_id_attempts() -> u32 {
    30
}

fn default_transient_backoff() -> u64 {
    5000
}

/// Processor and dispatch queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Worker tasks draining the dispatch queue
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Upper bound on a single generator call
    #[serde(default = "default_generator_timeout")]
    pub generator_timeout_seconds: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            generator_timeout_seconds: default_generator_timeout(),
        }
    }
}

impl ProcessingConfig {
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_seconds)
    }
}

fn default_workers() -> usize {
    4
}

fn default_generator_timeout() -> u64 {
    300
}

/// Job store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".vjobs/jobs.json")
}

impl Config {
    /// Load config from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    /// Try to load config from vjobs.toml in the given directory
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge CLI overrides into the config
    pub fn with_overrides(
        mut self,
        openai_url: Option<String>,
        runway_url: Option<String>,
        timeout: Option<u64>,
    ) -> Self {
        if let Some(u) = openai_url {
            self.openai.url = u;
        }
        if let Some(u) = runway_url {
            self.runway.url = u;
        }
        if let Some(t) = timeout {
            self.processing.generator_timeout_seconds = t;
        }
        self
    }

    /// Fill missing API keys from the given lookup (the process environment at the CLI)
    pub fn with_api_keys<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.openai.api_key.is_none() {
            self.openai.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        }
        if self.runway.api_key.is_none() {
            self.runway.api_key = lookup("RUNWAY_API_KEY").filter(|k| !k.is_empty());
        }
        self
    }

    /// Render the config as TOML (used by `init`)
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Missing API key for {0}; set it in vjobs.toml or the environment")]
    MissingApiKey(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.openai.url, "https://api.openai.com/v1");
        assert_eq!(config.openai.chat_model, "gpt-4");
        assert_eq!(config.image.primary_model, "gpt-image-1");
        assert_eq!(config.image.fallback_model, "dall-e-3");
        assert_eq!(config.runway.max_prompt_chars, 1000);
        assert_eq!(config.runway.api_version, "2024-11-06");
        assert_eq!(config.polling.job_interval_ms, 2000);
        assert_eq!(config.polling.video_interval_ms, 5000);
        assert_eq!(config.polling.task_id_max_attempts, 30);
        assert_eq!(config.processing.workers, 4);
        assert_eq!(config.store.path, PathBuf::from(".vjobs/jobs.json"));
    }

    #[test]
    fn test_config_with_overrides() {
        let config = Config::default().with_overrides(
            Some("http://localhost:9000".to_string()),
            Some("http://localhost:9001".to_string()),
            Some(30),
        );
        assert_eq!(config.openai.url, "http://localhost:9000");
        assert_eq!(config.runway.url, "http://localhost:9001");
        assert_eq!(config.processing.generator_timeout_seconds, 30);
    }

    #[test]
    fn test_api_keys_from_lookup() {
        let config = Config::default().with_api_keys(|name| match name {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "RUNWAY_API_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert!(config.runway.api_key.is_none());
    }

    #[test]
    fn test_file_key_wins_over_lookup() {
        let mut config = Config::default();
        config.openai.api_key = Some("from-file".to_string());
        let config = config.with_api_keys(|_| Some("from-env".to_string()));
        assert_eq!(config.openai.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.runway.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[openai]
chat_model = "gpt-4o"

[runway]
max_prompt_chars = 500

[polling]
job_interval_ms = 100
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.openai.chat_model, "gpt-4o");
        assert_eq!(config.openai.url, "https://api.openai.com/v1"); // default
        assert_eq!(config.runway.max_prompt_chars, 500);
        assert_eq!(config.polling.job_interval_ms, 100);
        assert_eq!(config.polling.video_interval_ms, 5000); // default
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let rendered = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.runway.model, "gen4_turbo");
    }
}
