//! Feature modules implementing the batch-processing API
//!
//! Each feature is organized as a vertical slice with its own commands,
//! queries, and routes:
//!
//! - `commands/` - Write operations (submit a batch)
//! - `queries/` - Read operations (job status, report download)
//! - `routes.rs` - HTTP route definitions

pub mod jobs;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::config::UploadConfig;
use crate::pipeline::PipelineOrchestrator;
use crate::progress::ProgressHub;
use crate::store::JobStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub store: Arc<dyn JobStore>,
    pub hub: Arc<ProgressHub>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub uploads: UploadConfig,
}

/// Creates the main API router with all feature routes mounted.
///
/// The jobs router carries its own body limit sized for a full batch of
/// maximum-size files; without it the framework's 2 MB default rejects
/// uploads well inside the configured per-file cap.
pub fn router(state: FeatureState) -> Router<()> {
    let body_limit = DefaultBodyLimit::max(state.uploads.body_limit());
    Router::new()
        .nest("/jobs", jobs::jobs_routes().layer(body_limit))
        .nest("/progress", jobs::progress_routes())
        .with_state(state)
}
