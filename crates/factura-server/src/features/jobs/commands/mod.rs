//! Job write operations

pub mod submit;

pub use submit::{SubmitBatchCommand, SubmitBatchError, SubmitBatchResponse, UploadedFile};
