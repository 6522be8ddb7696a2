//! Download report query
//!
//! The report exists only once the job completed; asking earlier is a
//! conflict, not a missing resource.

use std::sync::Arc;

use uuid::Uuid;

use crate::store::{JobStatus, JobStore, StoreError};

/// The report artifact ready for download.
#[derive(Debug, Clone)]
pub struct ReportDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadReportError {
    #[error("Job not found")]
    NotFound,

    #[error("Report is not ready: job is {0}")]
    NotReady(JobStatus),

    #[error("Report artifact is missing from disk")]
    ArtifactMissing(#[source] std::io::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub async fn handle(
    store: Arc<dyn JobStore>,
    job_id: Uuid,
) -> Result<ReportDownload, DownloadReportError> {
    let job = store.job(job_id).await?.ok_or(DownloadReportError::NotFound)?;

    let report_path = match (job.status, job.report_path) {
        (JobStatus::Completed, Some(path)) => path,
        (status, _) => return Err(DownloadReportError::NotReady(status)),
    };

    let bytes = tokio::fs::read(&report_path)
        .await
        .map_err(DownloadReportError::ArtifactMissing)?;

    Ok(ReportDownload {
        filename: format!("report-{job_id}.csv"),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryJobStore, Job};

    #[tokio::test]
    async fn test_missing_job_is_not_found() {
        let store = Arc::new(InMemoryJobStore::new());
        let err = handle(store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DownloadReportError::NotFound));
    }

    #[tokio::test]
    async fn test_queued_job_is_not_ready() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = Job::new("USD".to_string(), 1);
        store.create_job(&job, &[]).await.unwrap();

        let err = handle(store, job.id).await.unwrap_err();
        assert!(matches!(err, DownloadReportError::NotReady(JobStatus::Queued)));
    }

    #[tokio::test]
    async fn test_completed_job_serves_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        tokio::fs::write(&path, b"Date,Invoice Suffix\n").await.unwrap();

        let store = Arc::new(InMemoryJobStore::new());
        let job = Job::new("USD".to_string(), 1);
        store.create_job(&job, &[]).await.unwrap();
        store.mark_processing(job.id).await.unwrap();
        store
            .complete_job(job.id, path.to_str().unwrap())
            .await
            .unwrap();

        let download = handle(store, job.id).await.unwrap();
        assert_eq!(download.filename, format!("report-{}.csv", job.id));
        assert!(download.bytes.starts_with(b"Date,"));
    }
}
