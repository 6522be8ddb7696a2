//! Factura Server Library
//!
//! HTTP server for batch invoice processing: clients upload a batch of
//! invoice documents, the server extracts fields, converts totals into a
//! target currency, and produces a downloadable CSV report.
//!
//! # Overview
//!
//! - **API Endpoints**: Batch submission, job status, progress streaming,
//!   report download
//! - **Pipeline**: Sequential per-file stages with a per-run circuit
//!   breaker guarding the exchange-rate dependency
//! - **Database Management**: PostgreSQL integration with SQLx
//! - **Configuration**: Environment-based configuration management
//!
//! # Architecture
//!
//! The HTTP surface follows a vertical-slice layout: each feature carries
//! its own commands (writes), queries (reads), and routes. The processing
//! side is a pipeline of stage objects driven by an orchestrator that runs
//! one job at a time; live progress reaches subscribers through per-job
//! broadcast channels served over server-sent events.
//!
//! ## Framework Stack
//!
//! - **Axum**: Modern, ergonomic web framework
//! - **SQLx**: PostgreSQL driver and migrations
//! - **Tower**: Middleware and service abstractions

pub mod adapters;
pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use error::AppError;
