//! Job read operations

pub mod download_report;
pub mod get_job;

pub use download_report::{DownloadReportError, ReportDownload};
pub use get_job::{FileDetails, GetJobError, JobDetails};
