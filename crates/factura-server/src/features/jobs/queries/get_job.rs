//! Get job query
//!
//! Job status plus its per-file breakdown, in upload order.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use factura_common::money;

use crate::store::{FileRecord, FileStatus, JobStatus, JobStore, StoreError};

/// Job details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    pub id: Uuid,
    pub status: JobStatus,
    pub target_currency: String,
    pub total: i32,
    pub processed: i32,
    pub report_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub files: Vec<FileDetails>,
}

/// Per-file details within a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetails {
    pub filename: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&FileRecord> for FileDetails {
    fn from(file: &FileRecord) -> Self {
        Self {
            filename: file.filename.clone(),
            status: file.status,
            original_currency: file.original_currency.clone(),
            invoice_date: file.invoice_date,
            total_amount: file.total_amount.as_ref().map(money::format_amount),
            converted_amount: file.converted_amount.as_ref().map(money::format_amount),
            exchange_rate: file.exchange_rate.as_ref().map(money::format_rate),
            error_message: file.error_message.clone(),
        }
    }
}

/// Error type for get job query
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Job not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub async fn handle(store: Arc<dyn JobStore>, job_id: Uuid) -> Result<JobDetails, GetJobError> {
    let job = store.job(job_id).await?.ok_or(GetJobError::NotFound)?;
    let files = store.files(job_id).await?;

    Ok(JobDetails {
        id: job.id,
        status: job.status,
        target_currency: job.target_currency,
        total: job.total,
        processed: job.processed,
        report_available: job.status == JobStatus::Completed && job.report_path.is_some(),
        error_message: job.error_message,
        created_at: job.created_at,
        updated_at: job.updated_at,
        files: files.iter().map(FileDetails::from).collect(),
    })
}
