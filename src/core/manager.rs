use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::store::SharedJobStore;
use crate::error::VjobsError;
use crate::models::{validate_input, Job, JobStatus, JobType, JobUpdate};

/// Message recorded when a job fails without a reason
const DEFAULT_FAILURE: &str = "Job failed";

/// Owns every write to the job store.
///
/// Writes are serialized through a single lock so the read-check-write of
/// [`JobManager::update`] sees the latest record for the job.
pub struct JobManager {
    store: SharedJobStore,
    write_lock: Mutex<()>,
}

impl JobManager {
    pub fn new(store: SharedJobStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn shared(store: SharedJobStore) -> Arc<Self> {
        Arc::new(Self::new(store))
    }

    /// Create a job in pending status and return its id
    pub async fn create(&self, job_type: JobType, input_data: Value) -> Result<String, VjobsError> {
        validate_input(job_type, &input_data)?;

        let id = Uuid::new_v4().to_string();
        let job = Job::new(id.clone(), job_type, input_data);

        let _guard = self.write_lock.lock().await;
        self.store.insert(job).await?;
        info!("Created {} job {}", job_type, id);
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<Job, VjobsError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| VjobsError::NotFound(id.to_string()))
    }

    /// Apply a partial update; returns the job as written.
    ///
    /// Rejects any write to a terminal job, any status that moves backward,
    /// and any output that would replace a recorded provider task id.
    /// `completed_at` is stamped on the transition into a terminal status.
    pub async fn update(&self, id: &str, update: JobUpdate) -> Result<Job, VjobsError> {
        let _guard = self.write_lock.lock().await;
        let mut job = self.get(id).await?;

        let next_status = update.status.unwrap_or(job.status);
        if !job.status.can_transition_to(next_status) {
            warn!(
                "Rejected update for job {}: {} -> {}",
                id, job.status, next_status
            );
            return Err(VjobsError::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to: next_status,
            });
        }

        if update.error_message.is_some() && next_status != JobStatus::Failed {
            return Err(VjobsError::InvalidInput(format!(
                "errorMessage is only accepted with status failed (job {} would be {})",
                id, next_status
            )));
        }

        let attempted = update
            .output_data
            .as_ref()
            .and_then(|o| o.get("taskId"))
            .and_then(|t| t.as_str());
        if let (Some(existing), Some(attempted)) = (job.task_id(), attempted) {
            if existing != attempted {
                warn!("Rejected task {} for job {}: already bound to {}", attempted, id, existing);
                return Err(VjobsError::TaskConflict {
                    id: id.to_string(),
                    existing: existing.to_string(),
                    attempted: attempted.to_string(),
                });
            }
        }

        if let Some(output) = update.output_data {
            job.output_data = Some(output);
        }

        if next_status == JobStatus::Failed {
            let message = update
                .error_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE.to_string());
            job.error_message = Some(message);
        }

        let now = Utc::now();
        if next_status.is_terminal() {
            job.completed_at = Some(now);
        }
        if next_status != job.status {
            debug!("Job {}: {} -> {}", id, job.status, next_status);
        }
        job.status = next_status;
        job.updated_at = now;

        self.store.put(job.clone()).await?;
        Ok(job)
    }

    /// Counts of jobs per status
    pub async fn summary(&self) -> Result<JobSummary, VjobsError> {
        let mut summary = JobSummary::default();
        for job in self.store.list().await? {
            match job.status {
                JobStatus::Pending => summary.pending += 1,
                JobStatus::Processing => summary.processing += 1,
                JobStatus::Completed => summary.completed += 1,
                JobStatus::Failed => summary.failed += 1,
            }
            summary.total += 1;
        }
        Ok(summary)
    }

    pub async fn list(&self) -> Result<Vec<Job>, VjobsError> {
        Ok(self.store.list().await?)
    }
}

/// Summary of job statuses
#[derive(Debug, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Pending: {} | Processing: {} | Completed: {} | Failed: {}",
            self.total, self.pending, self.processing, self.completed, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryJobStore;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn manager() -> JobManager {
        JobManager::new(MemoryJobStore::shared())
    }

    #[tokio::test]
    async fn test_create_then_get_is_pending_with_exact_input() {
        let manager = manager();
        let input = json!({"trackArtist": "Nova", "trackName": "Midnight Dreams"});
        let id = manager.create(JobType::Styles, input.clone()).await.unwrap();

        let job = manager.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.input_data, input);
        assert!(job.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_missing_input() {
        let manager = manager();
        let result = manager.create(JobType::Video, Value::Null).await;
        assert!(matches!(result, Err(VjobsError::InvalidInput(_))));
        assert_eq!(manager.summary().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let manager = manager();
        assert!(matches!(manager.get("nope").await, Err(VjobsError::NotFound(_))));
        assert!(matches!(
            manager.update("nope", JobUpdate::status(JobStatus::Processing)).await,
            Err(VjobsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_stamps_completed_at_only_on_terminal() {
        let manager = manager();
        let id = manager.create(JobType::Image, json!({"prompt": "neon"})).await.unwrap();

        let job = manager.update(&id, JobUpdate::status(JobStatus::Processing)).await.unwrap();
        assert!(job.completed_at.is_none());

        let job = manager
            .update(&id, JobUpdate::completed(json!({"imageUrl": "u"})))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(job.updated_at >= job.created_at);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let manager = manager();
        let id = manager.create(JobType::Video, json!({"imageUrl": "i", "prompt": "p"})).await.unwrap();
        manager.update(&id, JobUpdate::status(JobStatus::Processing)).await.unwrap();
        manager
            .update(&id, JobUpdate::provisional(json!({"taskId": "rw_1", "status": "processing"})))
            .await
            .unwrap();

        let job = manager.update(&id, JobUpdate::default()).await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.task_id(), Some("rw_1"));
    }

    #[tokio::test]
    async fn test_recorded_task_id_cannot_be_replaced() {
        let manager = manager();
        let id = manager.create(JobType::Video, json!({"imageUrl": "i", "prompt": "p"})).await.unwrap();
        manager.update(&id, JobUpdate::status(JobStatus::Processing)).await.unwrap();
        assert_ok!(
            manager
                .update(&id, JobUpdate::provisional(json!({"taskId": "rw_1", "status": "processing"})))
                .await
        );
        assert_ok!(
            manager
                .update(&id, JobUpdate::provisional(json!({"taskId": "rw_1", "status": "processing"})))
                .await
        );

        let result = manager
            .update(&id, JobUpdate::provisional(json!({"taskId": "rw_2", "status": "processing"})))
            .await;
        assert!(matches!(result, Err(VjobsError::TaskConflict { .. })));
        assert_eq!(manager.get(&id).await.unwrap().task_id(), Some("rw_1"));
    }

    #[tokio::test]
    async fn test_terminal_job_is_frozen() {
        let manager = manager();
        let id = manager.create(JobType::Image, json!({"prompt": "neon"})).await.unwrap();
        manager.update(&id, JobUpdate::failed("upstream down")).await.unwrap();

        assert_err!(manager.update(&id, JobUpdate::status(JobStatus::Processing)).await);
        assert_err!(manager.update(&id, JobUpdate::completed(json!({}))).await);

        let job = manager.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("upstream down"));
    }

    #[tokio::test]
    async fn test_backward_transition_rejected() {
        let manager = manager();
        let id = manager.create(JobType::Image, json!({"prompt": "neon"})).await.unwrap();
        assert_ok!(manager.update(&id, JobUpdate::status(JobStatus::Processing)).await);
        let result = manager.update(&id, JobUpdate::status(JobStatus::Pending)).await;
        assert!(matches!(result, Err(VjobsError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_pending_cannot_skip_to_completed() {
        let manager = manager();
        let id = manager.create(JobType::Image, json!({"prompt": "neon"})).await.unwrap();
        let result = manager.update(&id, JobUpdate::completed(json!({"imageUrl": "u"}))).await;
        assert!(matches!(result, Err(VjobsError::InvalidTransition { .. })));
        assert_eq!(manager.get(&id).await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_error_message_requires_failed_status() {
        let manager = manager();
        let id = manager.create(JobType::Image, json!({"prompt": "neon"})).await.unwrap();
        let update = JobUpdate {
            status: Some(JobStatus::Processing),
            output_data: None,
            error_message: Some("nope".to_string()),
        };
        assert!(matches!(manager.update(&id, update).await, Err(VjobsError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failed_without_message_gets_default() {
        let manager = manager();
        let id = manager.create(JobType::Image, json!({"prompt": "neon"})).await.unwrap();
        let job = manager.update(&id, JobUpdate::status(JobStatus::Failed)).await.unwrap();
        assert_eq!(job.error_message.as_deref(), Some(DEFAULT_FAILURE));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let manager = manager();
        let a = manager.create(JobType::Image, json!({"prompt": "a"})).await.unwrap();
        let b = manager.create(JobType::Image, json!({"prompt": "b"})).await.unwrap();
        manager.create(JobType::Image, json!({"prompt": "c"})).await.unwrap();
        manager.update(&a, JobUpdate::status(JobStatus::Processing)).await.unwrap();
        manager.update(&a, JobUpdate::completed(json!({}))).await.unwrap();
        manager.update(&b, JobUpdate::failed("x")).await.unwrap();

        let summary = manager.summary().await.unwrap();
        assert_eq!(
            summary,
            JobSummary { total: 3, pending: 1, processing: 0, completed: 1, failed: 1 }
        );
        assert!(summary.to_string().starts_with("Total: 3"));
    }
}
