//! Mirror module - the mirroring pipeline
//!
//! This module contains the control flow that drives the bot:
//! - Source validation at startup
//! - Bounded-retry submission to the destination
//! - The coordinator that polls the feed and mirrors each new submission

mod coordinator;
mod submitter;
mod validator;

pub use coordinator::{run_mirror, Coordinator, CycleReport};
pub use submitter::{SubmitFailure, Submitter};
pub use validator::validate_sources;
