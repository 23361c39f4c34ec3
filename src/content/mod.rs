//! Content handling module for mirrorbot
//!
//! This module turns a fetched submission into the title, content and permalink
//! that get posted to the destination subreddit, rewriting tracking hostnames on
//! the way.

mod extract;
mod normalize;

pub use extract::{extract, ExtractionError, MirrorPost, PostKind};
pub use normalize::LinkNormalizer;
