//! In-memory job store
//!
//! Backs the test suite and local development without Postgres. State
//! machine rules match the SQL implementation: forward-only job status
//! transitions and a monotonic processed counter.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{FileRecord, Job, JobStatus, JobStore, StoreError};

#[derive(Default)]
pub struct InMemoryJobStore {
    inner: Mutex<HashMap<Uuid, (Job, Vec<FileRecord>)>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, job: &Job, files: &[FileRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(job.id, (job.clone(), files.to_vec()));
        Ok(())
    }

    async fn job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.get(&id).map(|(job, _)| job.clone()))
    }

    async fn files(&self, job_id: Uuid) -> Result<Vec<FileRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut files = inner
            .get(&job_id)
            .map(|(_, files)| files.clone())
            .unwrap_or_default();
        files.sort_by_key(|f| f.position);
        Ok(files)
    }

    async fn mark_processing(&self, job_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let (job, _) = inner.get_mut(&job_id).ok_or(StoreError::JobNotFound(job_id))?;
        if job.status == JobStatus::Queued {
            job.status = JobStatus::Processing;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_file(&self, file: &FileRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let (_, files) = inner
            .get_mut(&file.job_id)
            .ok_or(StoreError::JobNotFound(file.job_id))?;
        if let Some(existing) = files.iter_mut().find(|f| f.id == file.id) {
            *existing = file.clone();
        }
        Ok(())
    }

    async fn bump_processed(&self, job_id: Uuid) -> Result<i32, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let (job, _) = inner.get_mut(&job_id).ok_or(StoreError::JobNotFound(job_id))?;
        job.processed += 1;
        job.updated_at = Utc::now();
        Ok(job.processed)
    }

    async fn complete_job(&self, job_id: Uuid, report_path: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let (job, _) = inner.get_mut(&job_id).ok_or(StoreError::JobNotFound(job_id))?;
        job.status = JobStatus::Completed;
        job.report_path = Some(report_path.to_string());
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn fail_job(&self, job_id: Uuid, message: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let (job, _) = inner.get_mut(&job_id).ok_or(StoreError::JobNotFound(job_id))?;
        job.status = JobStatus::Error;
        job.error_message = Some(message.to_string());
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> (Job, Vec<FileRecord>) {
        let job = Job::new("USD".to_string(), 2);
        let files = vec![
            FileRecord::new(job.id, 0, "a.pdf".into(), "USD".into()),
            FileRecord::new(job.id, 1, "b.pdf".into(), "USD".into()),
        ];
        (job, files)
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let store = InMemoryJobStore::new();
        let (job, files) = seed();
        store.create_job(&job, &files).await.unwrap();

        let fetched = store.job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.total, 2);
        assert_eq!(store.files(job.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_files_ordered_by_position() {
        let store = InMemoryJobStore::new();
        let job = Job::new("USD".to_string(), 2);
        let files = vec![
            FileRecord::new(job.id, 1, "second.pdf".into(), "USD".into()),
            FileRecord::new(job.id, 0, "first.pdf".into(), "USD".into()),
        ];
        store.create_job(&job, &files).await.unwrap();

        let ordered = store.files(job.id).await.unwrap();
        assert_eq!(ordered[0].filename, "first.pdf");
        assert_eq!(ordered[1].filename, "second.pdf");
    }

    #[tokio::test]
    async fn test_bump_processed_is_monotonic() {
        let store = InMemoryJobStore::new();
        let (job, files) = seed();
        store.create_job(&job, &files).await.unwrap();

        assert_eq!(store.bump_processed(job.id).await.unwrap(), 1);
        assert_eq!(store.bump_processed(job.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_complete_job_records_report_path() {
        let store = InMemoryJobStore::new();
        let (job, files) = seed();
        store.create_job(&job, &files).await.unwrap();
        store.mark_processing(job.id).await.unwrap();
        store.complete_job(job.id, "/reports/x.csv").await.unwrap();

        let fetched = store.job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
        assert_eq!(fetched.report_path.as_deref(), Some("/reports/x.csv"));
    }

    #[tokio::test]
    async fn test_unknown_job_is_an_error() {
        let store = InMemoryJobStore::new();
        assert!(matches!(
            store.bump_processed(Uuid::new_v4()).await,
            Err(StoreError::JobNotFound(_))
        ));
    }
}
