//! Batch job feature
//!
//! Submission of invoice batches, status queries, live progress streaming,
//! and report download.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::{jobs_routes, progress_routes};
