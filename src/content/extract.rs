use crate::content::LinkNormalizer;
use crate::platform::Submission;
use std::fmt;
use thiserror::Error;

/// Bodies the platform substitutes for removed or deleted self-posts
const TOMBSTONE_BODIES: &[&str] = &["[removed]", "[deleted]"];

/// Errors that can occur while extracting content from a submission
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Couldn't get submission attribute '{field}' from {id}")]
    MissingField { id: String, field: &'static str },

    #[error("Couldn't get submission text from {id}")]
    UnreadableBody { id: String },
}

/// Whether the mirrored post carries text or a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Text,
    Link,
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKind::Text => write!(f, "self"),
            PostKind::Link => write!(f, "link"),
        }
    }
}

/// Normalized content ready to be posted to the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPost {
    pub title: String,
    /// Self-text for text posts, the external URL for link posts
    pub content: String,
    /// Link back to the source submission
    pub permalink: String,
    pub kind: PostKind,
}

/// Extracts the title, content and permalink of a submission
///
/// Every link-bearing field goes through `normalizer` exactly once.
///
/// # Returns
///
/// * `Ok(MirrorPost)` - Content for the destination post
/// * `Err(ExtractionError)` - The submission was removed, deleted, or is missing fields
pub fn extract(
    submission: &Submission,
    normalizer: &LinkNormalizer,
) -> Result<MirrorPost, ExtractionError> {
    let title = required(submission, submission.title.as_deref(), "title")?;
    let permalink = required(submission, submission.permalink.as_deref(), "permalink")?;

    let (content, kind) = if submission.is_self {
        let body = submission
            .selftext
            .as_deref()
            .filter(|body| !TOMBSTONE_BODIES.contains(&body.trim()))
            .ok_or_else(|| ExtractionError::UnreadableBody {
                id: submission.id.clone(),
            })?;
        (normalizer.normalize(body), PostKind::Text)
    } else {
        let url = required(submission, submission.url.as_deref(), "url")?;
        (normalizer.normalize(url), PostKind::Link)
    };

    Ok(MirrorPost {
        title: title.to_string(),
        content,
        permalink: normalizer.normalize(permalink),
        kind,
    })
}

fn required<'a>(
    submission: &Submission,
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ExtractionError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExtractionError::MissingField {
            id: submission.id.clone(),
            field,
        })
}
