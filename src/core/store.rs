//! Job store: keyed CRUD over job records, no business logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{Job, JobStatus, JobType};

/// Shared handle to a job store
pub type SharedJobStore = Arc<dyn JobStore>;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record; fails if the id is taken
    async fn insert(&self, job: Job) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError>;

    /// Replace an existing record; last write wins
    async fn put(&self, job: Job) -> Result<(), StoreError>;

    /// All records, oldest first
    async fn list(&self) -> Result<Vec<Job>, StoreError>;
}

/// Persisted record layout (snake_case); `Job` is the camelCase wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobRecord {
    id: String,
    #[serde(rename = "type")]
    job_type: JobType,
    status: JobStatus,
    input_data: Value,
    #[serde(default)]
    output_data: Option<Value>,
    #[serde(default)]
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobRecord {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            job_type: job.job_type,
            status: job.status,
            input_data: job.input_data,
            output_data: job.output_data,
            error_message: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
        }
    }
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            job_type: record.job_type,
            status: record.status,
            input_data: record.input_data,
            output_data: record.output_data,
            error_message: record.error_message,
            created_at: record.created_at,
            updated_at: record.updated_at,
            completed_at: record.completed_at,
        }
    }
}

fn sorted(entries: &HashMap<String, Job>) -> Vec<Job> {
    let mut jobs: Vec<Job> = entries.values().cloned().collect();
    jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    jobs
}

/// In-memory job store
#[derive(Default)]
pub struct MemoryJobStore {
    entries: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedJobStore {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id));
        }
        entries.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn put(&self, job: Job) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&job.id) {
            return Err(StoreError::JobNotFound(job.id));
        }
        entries.insert(job.id.clone(), job);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        Ok(sorted(&*self.entries.read().await))
    }
}

/// Job store persisted to a JSON file shared by every process in the project.
///
/// Nothing is cached: each call reads the file, and each mutation merges its
/// one record into the current file contents under an exclusive lock on
/// `<path>.lock`, then writes atomically (temp file, then rename). Concurrent
/// processes therefore only overwrite each other per job id.
pub struct FileJobStore {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

impl FileJobStore {
    /// Open the store at `path`, checking that existing records parse
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let existing = Self::load(path)?;
        info!("Opened job store {} ({} jobs)", path.display(), existing.len());
        Ok(Self {
            path: path.to_path_buf(),
            lock_path: path.with_extension("json.lock"),
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<HashMap<String, Job>, StoreError> {
        if !path.exists() {
            debug!("Job store {} does not exist, starting fresh", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::ReadError(path.to_path_buf(), e))?;

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let records: Vec<JobRecord> = serde_json::from_str(&content)
            .map_err(|e| StoreError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(records
            .into_iter()
            .map(|r| (r.id.clone(), Job::from(r)))
            .collect())
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::WriteError(parent.to_path_buf(), e))?;
            }
        }
        Ok(())
    }

    /// Write all records atomically (write to temp, then rename)
    fn save(&self, entries: &HashMap<String, Job>) -> Result<(), StoreError> {
        let records: Vec<JobRecord> = sorted(entries).into_iter().map(JobRecord::from).collect();

        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| StoreError::ParseError(self.path.clone(), e.to_string()))?;

        let temp_file = self.path.with_extension("json.tmp");
        fs::write(&temp_file, &json).map_err(|e| StoreError::WriteError(temp_file.clone(), e))?;
        fs::rename(&temp_file, &self.path)
            .map_err(|e| StoreError::WriteError(self.path.clone(), e))?;

        debug!("Saved {} jobs", records.len());
        Ok(())
    }

    /// Re-read the file, apply `change` to one record and write it back,
    /// holding the cross-process lock throughout. A failed change or save
    /// leaves the file as it was.
    fn modify<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut HashMap<String, Job>) -> Result<(), StoreError>,
    {
        self.ensure_parent()?;
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| StoreError::WriteError(self.lock_path.clone(), e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StoreError::WriteError(self.lock_path.clone(), e))?;

        let result = Self::load(&self.path).and_then(|mut entries| {
            change(&mut entries)?;
            self.save(&entries)
        });

        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!("Failed to release {}: {}", self.lock_path.display(), e);
        }
        result
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        self.modify(|entries| {
            if entries.contains_key(&job.id) {
                return Err(StoreError::Duplicate(job.id));
            }
            entries.insert(job.id.clone(), job);
            Ok(())
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        Ok(Self::load(&self.path)?.remove(id))
    }

    async fn put(&self, job: Job) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        self.modify(|entries| {
            if !entries.contains_key(&job.id) {
                return Err(StoreError::JobNotFound(job.id));
            }
            entries.insert(job.id.clone(), job);
            Ok(())
        })
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        Ok(sorted(&Self::load(&self.path)?))
    }
}
