//! Sequential invoice-processing pipeline

pub mod breaker;
pub mod context;
pub mod orchestrator;
pub mod stages;

pub use breaker::CircuitBreaker;
pub use context::{FileContext, Stage, StageOutcome};
pub use orchestrator::{FatalPipelineError, PipelineOrchestrator};
pub use stages::{build_stages, BREAKER_OPEN_MESSAGE};
