//! Submit batch command
//!
//! Validates an uploaded batch, persists the job and its file records, and
//! hands the batch to the pipeline orchestrator. The HTTP caller gets the
//! job id back immediately; processing runs in a spawned task.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use factura_common::currency;

use crate::config::UploadConfig;
use crate::features::FeatureState;
use crate::pipeline::FileContext;
use crate::progress::ProgressSnapshot;
use crate::store::{FileRecord, Job, JobStatus, StoreError};

/// Media types the extraction service accepts.
pub const ALLOWED_MEDIA_TYPES: [&str; 3] = ["application/pdf", "image/jpeg", "image/png"];

/// One file of the uploaded batch, as read from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct SubmitBatchCommand {
    pub target_currency: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBatchResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitBatchError {
    #[error("At least one file is required")]
    NoFiles,

    #[error("Batch has {count} files; at most {max} are allowed")]
    TooManyFiles { count: usize, max: usize },

    #[error("File '{filename}' exceeds the {max}-byte limit")]
    FileTooLarge { filename: String, max: usize },

    #[error("A filename is required for every file")]
    FilenameRequired,

    #[error("Filename must not exceed 255 characters")]
    FilenameLength,

    #[error("File '{filename}' has unsupported media type '{content_type}'")]
    UnsupportedMediaType { filename: String, content_type: String },

    #[error(transparent)]
    InvalidCurrency(#[from] factura_common::CommonError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl SubmitBatchCommand {
    pub fn validate(&self, limits: &UploadConfig) -> Result<(), SubmitBatchError> {
        if self.files.is_empty() {
            return Err(SubmitBatchError::NoFiles);
        }
        if self.files.len() > limits.max_batch_files {
            return Err(SubmitBatchError::TooManyFiles {
                count: self.files.len(),
                max: limits.max_batch_files,
            });
        }
        currency::validate_code(&self.target_currency)?;

        for file in &self.files {
            if file.filename.trim().is_empty() {
                return Err(SubmitBatchError::FilenameRequired);
            }
            if file.filename.len() > 255 {
                return Err(SubmitBatchError::FilenameLength);
            }
            if file.bytes.len() > limits.max_file_bytes {
                return Err(SubmitBatchError::FileTooLarge {
                    filename: file.filename.clone(),
                    max: limits.max_file_bytes,
                });
            }
            let content_type = file.content_type.as_deref().unwrap_or("");
            if !ALLOWED_MEDIA_TYPES.contains(&content_type) {
                return Err(SubmitBatchError::UnsupportedMediaType {
                    filename: file.filename.clone(),
                    content_type: content_type.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[tracing::instrument(skip(state, command), fields(files = command.files.len()))]
pub async fn handle(
    state: FeatureState,
    command: SubmitBatchCommand,
) -> Result<SubmitBatchResponse, SubmitBatchError> {
    command.validate(&state.uploads)?;

    let target = currency::validate_code(&command.target_currency)?;
    let job = Job::new(target.clone(), command.files.len() as i32);

    let mut records = Vec::with_capacity(command.files.len());
    let mut documents = Vec::with_capacity(command.files.len());
    for (position, file) in command.files.into_iter().enumerate() {
        let record = FileRecord::new(job.id, position as i32, file.filename, target.clone());
        records.push(record.clone());
        documents.push(FileContext::new(
            record,
            file.bytes,
            file.content_type.unwrap_or_default(),
        ));
    }

    state.store.create_job(&job, &records).await?;

    // The broadcaster must exist before the caller can subscribe, and the
    // queued snapshot is what a subscriber sees while the job waits for
    // the processing slot.
    let broadcaster = state.hub.register(job.id);
    broadcaster.publish(ProgressSnapshot::new(&job, "queued", "job accepted"));

    tracing::info!(job_id = %job.id, total = job.total, "batch accepted");

    let response = SubmitBatchResponse {
        job_id: job.id,
        status: job.status,
        total: job.total,
    };
    tokio::spawn(state.orchestrator.clone().run(job, documents));

    Ok(response)
}
