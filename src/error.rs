use std::path::PathBuf;
use thiserror::Error;

use crate::models::{ConfigError, JobStatus, JobValidationError};

/// Main error type for vjobs
#[derive(Error, Debug)]
pub enum VjobsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Timed out after {attempts} attempts: {message}")]
    Timeout { attempts: u32, message: String },

    #[error("Transient provider error: {0}")]
    Transient(String),

    /// A job reached `failed`; carries the recorded error message verbatim
    #[error("{0}")]
    JobFailed(String),

    #[error("Invalid status transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// A write tried to replace the provider task id already recorded on a job
    #[error("Job {id} is bound to task {existing}, refusing task {attempted}")]
    TaskConflict {
        id: String,
        existing: String,
        attempted: String,
    },

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JobValidationError> for VjobsError {
    fn from(err: JobValidationError) -> Self {
        VjobsError::InvalidInput(err.to_string())
    }
}

impl VjobsError {
    /// Whether a caller should retry after a delay rather than give up
    pub fn is_transient(&self) -> bool {
        matches!(self, VjobsError::Transient(_))
    }
}

/// Failure of a generator's upstream work; recorded on the job, never thrown past the processor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct GeneratorError(pub String);

impl GeneratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<ProviderError> for GeneratorError {
    fn from(err: ProviderError) -> Self {
        GeneratorError(err.to_string())
    }
}

impl From<JobValidationError> for GeneratorError {
    fn from(err: JobValidationError) -> Self {
        GeneratorError(err.to_string())
    }
}

/// Errors related to the persisted job store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read job store {0}: {1}")]
    ReadError(PathBuf, std::io::Error),

    #[error("Failed to write job store {0}: {1}")]
    WriteError(PathBuf, std::io::Error),

    #[error("Failed to parse job store {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Job already exists: {0}")]
    Duplicate(String),

    #[error("Job not found in store: {0}")]
    JobNotFound(String),
}

/// Errors from the HTTP providers (OpenAI, Runway)
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("{provider} API error: {status} - {message}")]
    HttpError {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),
}

impl ProviderError {
    /// Network-level failures that say nothing about the task itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProviderError::ConnectionRefused(_)
                | ProviderError::Timeout(_)
                | ProviderError::RequestFailed(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(0)
        } else if err.is_connect() {
            ProviderError::ConnectionRefused(err.to_string())
        } else if err.is_decode() {
            ProviderError::ParseError(err.to_string())
        } else {
            ProviderError::RequestFailed(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, VjobsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobType;

    #[test]
    fn test_job_failed_displays_message_verbatim() {
        let err = VjobsError::JobFailed("Runway task failed: content policy violation".to_string());
        assert_eq!(err.to_string(), "Runway task failed: content policy violation");
    }

    #[test]
    fn test_validation_error_becomes_invalid_input() {
        let err: VjobsError = JobValidationError::MissingInput(JobType::Styles).into();
        assert!(matches!(err, VjobsError::InvalidInput(_)));
        assert!(err.to_string().contains("styles"));
    }

    #[test]
    fn test_provider_error_into_generator_error() {
        let err: GeneratorError = ProviderError::HttpError {
            provider: "OpenAI",
            status: 400,
            message: "Bad Request".to_string(),
        }
        .into();
        assert_eq!(err.message(), "OpenAI API error: 400 - Bad Request");
    }

    #[test]
    fn test_transport_classification() {
        assert!(ProviderError::Timeout(5).is_transport());
        assert!(ProviderError::ConnectionRefused("x".to_string()).is_transport());
        assert!(!ProviderError::ParseError("x".to_string()).is_transport());
        assert!(!ProviderError::HttpError {
            provider: "Runway",
            status: 404,
            message: String::new(),
        }
        .is_transport());
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = VjobsError::InvalidTransition {
            id: "j1".to_string(),
            from: JobStatus::Failed,
            to: JobStatus::Processing,
        };
        assert_eq!(err.to_string(), "Invalid status transition for job j1: failed -> processing");
    }

    #[test]
    fn test_is_transient() {
        assert!(VjobsError::Transient("reset".to_string()).is_transient());
        assert!(!VjobsError::NotFound("j".to_string()).is_transient());
    }
}
