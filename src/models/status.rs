use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a job in the processing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job has been created but no processor has picked it up
    Pending,
    /// A processor is running the generator, or the provider is still rendering
    Processing,
    /// Generator or provider produced the final output
    Completed,
    /// Generator or provider failed; `error_message` carries the reason
    Failed,
}

impl JobStatus {
    /// Check if this status is terminal (completed or failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check whether a write may move a job from this status to `next`.
    ///
    /// `pending -> processing -> {completed, failed}` and `pending -> failed`.
    /// Non-terminal states also accept themselves (a partial update that
    /// leaves the status alone). Terminal states accept nothing.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Pending | Processing | Failed)
                | (Processing, Processing | Completed | Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reported by the external task poller after one provider query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Processing,
    Completed,
    Failed,
}

impl From<JobStatus> for ProviderStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Completed => ProviderStatus::Completed,
            JobStatus::Failed => ProviderStatus::Failed,
            JobStatus::Pending | JobStatus::Processing => ProviderStatus::Processing,
        }
    }
}
