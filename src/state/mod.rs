//! State module for tracking mirroring progress
//!
//! This module provides the in-memory state the mirror loop owns.
//!
//! # Components
//!
//! - `ProcessedSet`: Bounded set of submission ids that must not be posted again
//! - `SourceList`: The source subreddits that survived validation

mod processed;
mod sources;

// Re-export main types
pub use processed::ProcessedSet;
pub use sources::SourceList;
