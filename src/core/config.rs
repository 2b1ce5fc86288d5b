use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::core::store::{FileJobStore, SharedJobStore};
use crate::error::VjobsError;
use crate::models::Config;

/// CLI overrides applied on top of the config file
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub openai_url: Option<String>,
    pub runway_url: Option<String>,
    pub timeout: Option<u64>,
}

/// Load configuration from the project directory with CLI overrides.
///
/// API keys missing from the file are taken from the process environment.
pub fn load_config(project_root: &Path, overrides: ConfigOverrides) -> Result<Config, VjobsError> {
    let config = match &overrides.config_path {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_from_dir(project_root)?,
    };
    let config = config
        .with_overrides(overrides.openai_url, overrides.runway_url, overrides.timeout)
        .with_api_keys(|name| std::env::var(name).ok());

    info!(
        "Configuration loaded: openai={}, runway={}, store={}",
        config.openai.url,
        config.runway.url,
        config.store.path.display()
    );

    Ok(config)
}

/// Resolve the store path against the project root
pub fn store_path(project_root: &Path, config: &Config) -> PathBuf {
    if config.store.path.is_absolute() {
        config.store.path.clone()
    } else {
        project_root.join(&config.store.path)
    }
}

/// Open the file-backed job store named by the config
pub fn open_store(project_root: &Path, config: &Config) -> Result<SharedJobStore, VjobsError> {
    let store = FileJobStore::open(&store_path(project_root, config))?;
    Ok(Arc::new(store))
}
