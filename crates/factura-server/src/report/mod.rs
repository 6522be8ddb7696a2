//! Deterministic report assembly

pub mod assembler;
pub mod writer;

pub use assembler::{assemble, derive_suffix, ReportRow, DATE_ERROR, DATE_NOT_FOUND, SUFFIX_NOT_FOUND};
pub use writer::{write_csv, ReportWriteError};
