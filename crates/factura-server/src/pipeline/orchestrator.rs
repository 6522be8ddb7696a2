//! Batch job orchestrator
//!
//! One job runs at a time; further submissions queue behind the slot and
//! stay `queued` until it frees up. Per-file failures never abort the
//! batch: the file resolves as failed, the run continues, and the report
//! carries a placeholder row. Only a failure to produce or persist the
//! report artifact marks the job itself as errored.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{FieldExtractor, RateLookup};
use crate::progress::{ProgressBroadcaster, ProgressHub, ProgressSnapshot};
use crate::report;
use crate::store::{Job, JobStatus, JobStore, StoreError};

use super::context::{FileContext, StageOutcome};
use super::stages::build_stages;

/// Errors that abort a run and mark the job itself as errored.
#[derive(Debug, Error)]
pub enum FatalPipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Report(#[from] report::ReportWriteError),

    #[error("failed to write report artifact: {0}")]
    Artifact(#[from] std::io::Error),
}

pub struct PipelineOrchestrator {
    store: Arc<dyn JobStore>,
    extractor: Arc<dyn FieldExtractor>,
    rates: Arc<dyn RateLookup>,
    hub: Arc<ProgressHub>,
    /// Single processing slot. Held for the duration of one job run.
    slot: Mutex<()>,
    reports_dir: PathBuf,
    rate_timeout: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        extractor: Arc<dyn FieldExtractor>,
        rates: Arc<dyn RateLookup>,
        hub: Arc<ProgressHub>,
        reports_dir: impl Into<PathBuf>,
        rate_timeout: Duration,
    ) -> Self {
        Self {
            store,
            extractor,
            rates,
            hub,
            slot: Mutex::new(()),
            reports_dir: reports_dir.into(),
            rate_timeout,
        }
    }

    pub fn report_path(&self, job_id: Uuid) -> PathBuf {
        self.reports_dir.join(format!("{job_id}.csv"))
    }

    /// Run one job to a terminal state. Never returns an error to the
    /// caller; fatal outcomes are recorded on the job itself.
    #[instrument(skip(self, documents), fields(job_id = %job.id))]
    pub async fn run(self: Arc<Self>, mut job: Job, documents: Vec<FileContext>) {
        let broadcaster = self
            .hub
            .get(job.id)
            .unwrap_or_else(|| self.hub.register(job.id));

        // Queued until the slot frees up
        let _slot = self.slot.lock().await;

        match self.run_inner(&mut job, documents, &broadcaster).await {
            Ok(report_path) => {
                info!(report = %report_path, "job completed");
                job.status = JobStatus::Completed;
                job.report_path = Some(report_path);
                broadcaster.publish(ProgressSnapshot::new(&job, "completed", "report ready"));
            },
            Err(e) => {
                error!(error = %e, "job failed");
                let message = e.to_string();
                if let Err(store_err) = self.store.fail_job(job.id, &message).await {
                    // The terminal snapshot still goes out even if the
                    // status write is lost.
                    warn!(error = %store_err, "could not record job failure");
                }
                job.status = JobStatus::Error;
                job.error_message = Some(message.clone());
                broadcaster.publish(ProgressSnapshot::new(&job, "error", message));
            },
        }

        self.hub.remove(job.id);
    }

    async fn run_inner(
        &self,
        job: &mut Job,
        documents: Vec<FileContext>,
        broadcaster: &ProgressBroadcaster,
    ) -> Result<String, FatalPipelineError> {
        self.store.mark_processing(job.id).await?;
        job.status = JobStatus::Processing;
        broadcaster.publish(ProgressSnapshot::new(job, "processing", "processing started"));

        // One breaker per run, owned by the rate-lookup stage
        let stages = build_stages(
            self.extractor.clone(),
            self.rates.clone(),
            self.rate_timeout,
        );

        let mut completed_files = Vec::new();
        for mut ctx in documents {
            let filename = ctx.record.filename.clone();

            for stage in &stages {
                let outcome = stage.process(&mut ctx).await;
                self.store.update_file(&ctx.record).await?;
                broadcaster.publish(
                    ProgressSnapshot::new(job, stage.name(), format!("{}: {filename}", stage.name()))
                        .with_current_file(filename.clone())
                        .with_completed_files(completed_files.clone()),
                );
                if outcome == StageOutcome::Resolved {
                    break;
                }
            }

            job.processed = self.store.bump_processed(job.id).await?;
            completed_files.push(filename.clone());
            broadcaster.publish(
                ProgressSnapshot::new(job, "file-resolved", format!("finished {filename}"))
                    .with_completed_files(completed_files.clone()),
            );
        }

        self.write_report(job).await
    }

    /// Assemble and persist the report artifact, then complete the job.
    async fn write_report(&self, job: &Job) -> Result<String, FatalPipelineError> {
        let files = self.store.files(job.id).await?;
        let rows = report::assemble(&files);
        let csv = report::write_csv(&job.target_currency, &rows)?;

        tokio::fs::create_dir_all(&self.reports_dir).await?;
        let path = self.report_path(job.id);
        tokio::fs::write(&path, csv).await?;

        let path = path_to_string(&path);
        self.store.complete_job(job.id, &path).await?;
        Ok(path)
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
