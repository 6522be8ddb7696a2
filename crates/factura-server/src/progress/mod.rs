//! Progress broadcasting for live job status
//!
//! Immutable snapshots of job state, pushed to any number of subscribers.
//! Each job gets its own broadcaster; a hub maps job ids to broadcasters
//! for the SSE endpoint.

pub mod broadcaster;
pub mod hub;

pub use broadcaster::{ProgressBroadcaster, ProgressSnapshot};
pub use hub::ProgressHub;
