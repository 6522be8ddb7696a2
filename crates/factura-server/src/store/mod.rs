//! Job/file state store
//!
//! Durable records for jobs and their constituent files. The store is
//! mutated only by the pipeline orchestrator of the currently running job;
//! everything else (progress queries, report download) reads.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryJobStore;
pub use pg::PgJobStore;

/// Lifecycle of a batch job. Transitions only move forward:
/// queued -> processing -> completed | error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    /// Completed and error are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-file pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unprocessed,
    Extracting,
    RatePending,
    Converting,
    Success,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Unprocessed => "unprocessed",
            FileStatus::Extracting => "extracting",
            FileStatus::RatePending => "rate_pending",
            FileStatus::Converting => "converting",
            FileStatus::Success => "success",
            FileStatus::Failed => "failed",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, FileStatus::Success | FileStatus::Failed)
    }
}

impl std::str::FromStr for FileStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprocessed" => Ok(FileStatus::Unprocessed),
            "extracting" => Ok(FileStatus::Extracting),
            "rate_pending" => Ok(FileStatus::RatePending),
            "converting" => Ok(FileStatus::Converting),
            "success" => Ok(FileStatus::Success),
            "failed" => Ok(FileStatus::Failed),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub target_currency: String,
    pub total: i32,
    pub processed: i32,
    pub report_path: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(target_currency: String, total: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            target_currency,
            total,
            processed: 0,
            report_path: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One uploaded document within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    /// Original upload order, zero-based. Report assembly depends on it.
    pub position: i32,
    pub filename: String,
    pub status: FileStatus,
    pub original_currency: Option<String>,
    pub target_currency: String,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_identifier: Option<String>,
    pub total_amount: Option<BigDecimal>,
    pub vendor_name: Option<String>,
    pub converted_amount: Option<BigDecimal>,
    pub exchange_rate: Option<BigDecimal>,
    pub error_message: Option<String>,
}

impl FileRecord {
    pub fn new(job_id: Uuid, position: i32, filename: String, target_currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            position,
            filename,
            status: FileStatus::Unprocessed,
            original_currency: None,
            target_currency,
            invoice_date: None,
            invoice_identifier: None,
            total_amount: None,
            vendor_name: None,
            converted_amount: None,
            exchange_rate: None,
            error_message: None,
        }
    }

    /// Record a per-file failure without aborting the batch.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = FileStatus::Failed;
        self.error_message = Some(message.into());
    }
}

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job not found: {0}")]
    JobNotFound(Uuid),

    #[error("unknown status value: {0}")]
    InvalidStatus(String),
}

/// Durable access to jobs and files.
///
/// Postgres in production; an in-memory implementation backs the test suite.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a job and its files atomically. Files are expected in upload
    /// order with contiguous positions starting at zero.
    async fn create_job(&self, job: &Job, files: &[FileRecord]) -> Result<(), StoreError>;

    async fn job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// All files of a job, ordered by upload position.
    async fn files(&self, job_id: Uuid) -> Result<Vec<FileRecord>, StoreError>;

    /// queued -> processing.
    async fn mark_processing(&self, job_id: Uuid) -> Result<(), StoreError>;

    /// Persist the current state of one file record.
    async fn update_file(&self, file: &FileRecord) -> Result<(), StoreError>;

    /// Increment the processed counter; returns the new value.
    async fn bump_processed(&self, job_id: Uuid) -> Result<i32, StoreError>;

    /// processing -> completed, recording the report artifact path.
    async fn complete_job(&self, job_id: Uuid, report_path: &str) -> Result<(), StoreError>;

    /// processing -> error. Reserved for fatal pipeline errors only.
    async fn fail_job(&self, job_id: Uuid, message: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_file_status_round_trip() {
        for status in [
            FileStatus::Unprocessed,
            FileStatus::Extracting,
            FileStatus::RatePending,
            FileStatus::Converting,
            FileStatus::Success,
            FileStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<FileStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_new_job_starts_queued() {
        let job = Job::new("USD".to_string(), 3);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.processed, 0);
        assert_eq!(job.total, 3);
    }

    #[test]
    fn test_new_file_starts_unprocessed() {
        let job_id = Uuid::new_v4();
        let file = FileRecord::new(job_id, 0, "invoice.pdf".to_string(), "USD".to_string());
        assert_eq!(file.status, FileStatus::Unprocessed);
        assert!(file.original_currency.is_none());
        assert_eq!(file.target_currency, "USD");
    }

    #[test]
    fn test_mark_failed_records_message() {
        let mut file = FileRecord::new(Uuid::new_v4(), 0, "a.pdf".into(), "USD".into());
        file.mark_failed("extraction failed");
        assert_eq!(file.status, FileStatus::Failed);
        assert_eq!(file.error_message.as_deref(), Some("extraction failed"));
    }
}
