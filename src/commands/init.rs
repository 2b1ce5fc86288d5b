use std::fs;
use std::path::Path;
use tracing::info;

use crate::core::store_path;
use crate::error::VjobsError;
use crate::models::{Config, CONFIG_FILE};

/// Initialize a vjobs project: default config and an empty job store
pub fn init_project(project_root: &Path) -> Result<(), VjobsError> {
    println!("Initializing vjobs project...");

    if !project_root.exists() {
        fs::create_dir_all(project_root)?;
        info!("Created project directory: {}", project_root.display());
    }

    let config = Config::default();
    create_file_if_not_exists(&project_root.join(CONFIG_FILE), &config.to_toml()?)?;

    let store = store_path(project_root, &config);
    if let Some(parent) = store.parent() {
        fs::create_dir_all(parent)?;
    }
    create_file_if_not_exists(&store, "[]")?;

    info!("vjobs project initialized successfully!");
    print_next_steps(project_root);

    Ok(())
}

fn create_file_if_not_exists(path: &Path, content: &str) -> Result<(), VjobsError> {
    if !path.exists() {
        fs::write(path, content)?;
        info!("Created file: {}", path.display());
    } else {
        info!("File already exists: {}", path.display());
    }
    Ok(())
}

fn print_next_steps(project_root: &Path) {
    println!("vjobs project initialized at {}", project_root.display());
    println!("\nNext steps:");
    println!("1. Set OPENAI_API_KEY and RUNWAY_API_KEY (or add api_key to {})", CONFIG_FILE);
    println!("2. Run 'vjobs generate styles --track \"Midnight Dreams\"' for a first job");
    println!("3. Run 'vjobs status -v' to inspect the job store");
}
