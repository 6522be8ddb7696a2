//! Job routes
//!
//! Batch submission, job status, report download, and the server-sent-events
//! progress stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::features::FeatureState;
use crate::progress::ProgressSnapshot;

use super::commands::{submit, SubmitBatchCommand, SubmitBatchError, UploadedFile};
use super::queries::{download_report, get_job, DownloadReportError, GetJobError};

/// Idle interval after which the stream repeats the latest snapshot as a
/// keepalive.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Create job routes
pub fn jobs_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(submit_batch))
        .route("/:job_id", get(job_details))
        .route("/:job_id/report", get(report))
}

/// Create progress-stream routes
pub fn progress_routes() -> Router<FeatureState> {
    Router::new().route("/:job_id", get(progress_stream))
}

/// Submit a batch of invoice documents
///
/// POST /jobs (multipart: `target_currency` text field plus one `files`
/// field per document). Returns 202 with the job id.
#[tracing::instrument(skip(state, multipart))]
async fn submit_batch(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut target_currency = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart field: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "target_currency" => {
                target_currency = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {e}")))?;
            },
            "files" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file bytes: {e}")))?;
                files.push(UploadedFile {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            },
            _ => {},
        }
    }

    let command = SubmitBatchCommand {
        target_currency,
        files,
    };

    let response = submit::handle(state, command).await.map_err(|e| match e {
        SubmitBatchError::Store(store_err) => AppError::from(store_err),
        other => AppError::Validation(other.to_string()),
    })?;

    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

/// Get a specific job by ID
///
/// GET /jobs/:job_id
async fn job_details(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let details = get_job::handle(state.store, job_id).await.map_err(|e| match e {
        GetJobError::NotFound => AppError::NotFound(format!("Job not found: {job_id}")),
        GetJobError::Store(store_err) => AppError::from(store_err),
    })?;

    Ok((StatusCode::OK, Json(details)).into_response())
}

/// Download the finished report
///
/// GET /jobs/:job_id/report. 409 until the job completes.
async fn report(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let download = download_report::handle(state.store, job_id)
        .await
        .map_err(|e| match e {
            DownloadReportError::NotFound => {
                AppError::NotFound(format!("Job not found: {job_id}"))
            },
            DownloadReportError::NotReady(status) => {
                AppError::Conflict(format!("Report is not ready: job is {status}"))
            },
            DownloadReportError::ArtifactMissing(io_err) => {
                tracing::error!(job_id = %job_id, error = %io_err, "report artifact missing");
                AppError::Internal("Report artifact is missing".to_string())
            },
            DownloadReportError::Store(store_err) => AppError::from(store_err),
        })?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.filename),
        ),
    ];
    Ok((StatusCode::OK, headers, download.bytes).into_response())
}

/// Stream progress snapshots for a job
///
/// GET /progress/:job_id. A late subscriber first receives the latest
/// retained snapshot; the stream closes after a terminal snapshot.
async fn progress_stream(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (pending, receiver) = match state.hub.get(job_id) {
        Some(broadcaster) => broadcaster.subscribe(),
        None => {
            // The broadcaster is gone once the run finished; serve a single
            // terminal snapshot derived from the stored job.
            let job = state
                .store
                .job(job_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Job not found: {job_id}")))?;
            let message = job
                .error_message
                .clone()
                .unwrap_or_else(|| "job completed".to_string());
            let snapshot = ProgressSnapshot::new(&job, job.status.as_str(), message);
            let (sender, receiver) = broadcast::channel(1);
            drop(sender);
            (Some(snapshot), receiver)
        },
    };

    let stream = futures::stream::unfold(
        SnapshotStream {
            receiver,
            pending,
            last: None,
            done: false,
        },
        |mut s| async move {
            if s.done {
                return None;
            }
            if let Some(snapshot) = s.pending.take() {
                s.done = snapshot.is_terminal();
                s.last = Some(snapshot.clone());
                return Some((snapshot_event(&snapshot), s));
            }
            loop {
                match tokio::time::timeout(KEEPALIVE_INTERVAL, s.receiver.recv()).await {
                    Ok(Ok(snapshot)) => {
                        s.done = snapshot.is_terminal();
                        s.last = Some(snapshot.clone());
                        return Some((snapshot_event(&snapshot), s));
                    },
                    // Dropped behind the channel; newer snapshots follow
                    Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                    Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                    Err(_elapsed) => match &s.last {
                        Some(last) => return Some((snapshot_event(&last.as_keepalive()), s)),
                        None => continue,
                    },
                }
            }
        },
    );

    Ok(Sse::new(stream.map(Ok::<_, Infallible>)))
}

struct SnapshotStream {
    receiver: broadcast::Receiver<ProgressSnapshot>,
    pending: Option<ProgressSnapshot>,
    last: Option<ProgressSnapshot>,
    done: bool,
}

fn snapshot_event(snapshot: &ProgressSnapshot) -> Event {
    match Event::default().event("progress").json_data(snapshot) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize progress snapshot");
            Event::default().comment("snapshot serialization failed")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jobs_routes_exist() {
        let _router = jobs_routes();
        let _router = progress_routes();
    }
}
