//! Stage contract and per-file processing context
//!
//! Each file moves through an explicit sequence of stage objects sharing one
//! strongly-typed mutable context.

use async_trait::async_trait;

use crate::store::FileRecord;

/// Mutable state for one file's trip through the pipeline.
///
/// `record` is the authoritative file state; stages mutate it in place and
/// the orchestrator persists it after every stage.
#[derive(Debug)]
pub struct FileContext {
    pub record: FileRecord,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub target_currency: String,
}

impl FileContext {
    pub fn new(record: FileRecord, bytes: Vec<u8>, mime_type: String) -> Self {
        let target_currency = record.target_currency.clone();
        Self {
            record,
            bytes,
            mime_type,
            target_currency,
        }
    }
}

/// What the orchestrator should do after a stage ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Hand the context to the next stage.
    Continue,
    /// The file reached success or failed; skip the remaining stages.
    Resolved,
}

/// One step of the per-file pipeline.
///
/// Stages never abort the batch: failures are recorded on the context's
/// file record and reported as [`StageOutcome::Resolved`].
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name used for progress events and logging.
    fn name(&self) -> &'static str;

    async fn process(&self, ctx: &mut FileContext) -> StageOutcome;
}
