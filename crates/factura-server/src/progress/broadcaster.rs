//! Per-job progress broadcaster
//!
//! A broadcast channel plus a retained copy of the most recent snapshot, so
//! a late subscriber is never blank: it immediately receives the latest
//! state and then the live sequence from there on. Snapshots are immutable
//! once published and totally ordered by `seq`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::store::{Job, JobStatus};

/// Immutable view of job state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub current_step: String,
    pub processed: i32,
    pub total: i32,
    pub percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    pub message: String,
    pub completed_files: Vec<String>,
    /// Monotonic per-job sequence number, assigned on publish.
    pub seq: u64,
    /// Keepalive snapshots repeat the latest state and never advance
    /// `processed`.
    pub keepalive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressSnapshot {
    pub fn new(job: &Job, current_step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            current_step: current_step.into(),
            processed: job.processed,
            total: job.total,
            percentage: percentage(job.processed, job.total),
            current_file: None,
            message: message.into(),
            completed_files: Vec::new(),
            seq: 0,
            keepalive: false,
            error: job.error_message.clone(),
        }
    }

    pub fn with_current_file(mut self, filename: impl Into<String>) -> Self {
        self.current_file = Some(filename.into());
        self
    }

    pub fn with_completed_files(mut self, files: Vec<String>) -> Self {
        self.completed_files = files;
        self
    }

    /// Copy of this snapshot flagged as a keepalive tick.
    pub fn as_keepalive(&self) -> Self {
        let mut copy = self.clone();
        copy.keepalive = true;
        copy
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal() && !self.keepalive
    }
}

/// `round(processed / total * 100)`, clamped for empty jobs.
pub fn percentage(processed: i32, total: i32) -> u8 {
    if total <= 0 {
        return 0;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u8
}

/// Publishes snapshots for one job.
pub struct ProgressBroadcaster {
    sender: broadcast::Sender<ProgressSnapshot>,
    latest: RwLock<Option<ProgressSnapshot>>,
    seq: AtomicU64,
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            latest: RwLock::new(None),
            seq: AtomicU64::new(0),
        }
    }

    /// Assigns the next sequence number, retains the snapshot as latest,
    /// and fans it out. No active subscribers is not an error.
    pub fn publish(&self, mut snapshot: ProgressSnapshot) {
        snapshot.seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        *self.latest.write().unwrap() = Some(snapshot.clone());
        let _ = self.sender.send(snapshot);
    }

    /// Latest snapshot plus a receiver for everything published after it.
    ///
    /// The receiver is created before the latest snapshot is read, so a
    /// subscriber sees every snapshot from that point forward (possibly
    /// with the latest one duplicated, never skipped).
    pub fn subscribe(&self) -> (Option<ProgressSnapshot>, broadcast::Receiver<ProgressSnapshot>) {
        let receiver = self.sender.subscribe();
        let latest = self.latest.read().unwrap().clone();
        (latest, receiver)
    }

    pub fn latest(&self) -> Option<ProgressSnapshot> {
        self.latest.read().unwrap().clone()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
