//! External collaborator boundaries
//!
//! The pipeline only ever talks to the outside world through these two
//! traits. Concrete HTTP clients live here; the orchestrator and its tests
//! depend on the traits alone.

pub mod extraction;
pub mod mock;
pub mod rates;

pub use extraction::{DocumentIntelligenceClient, ExtractedFields, ExtractionError, FieldExtractor};
pub use rates::{FrankfurterClient, RateLookup, RateLookupError};
