//! crates/story_weaver_core/src/error.rs
//!
//! The error taxonomy reported by the story workflow.

use crate::ports::PortError;

/// Every failure the workflow can report to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoryError {
    /// Bad or missing input. The caller can correct it and retry.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The validator and the synthesizer tables disagree. Indicates a wiring bug.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Story generation failed: {0}")]
    Generation(String),

    #[error("Illustration failed: {0}")]
    Illustration(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    /// Unknown id, or an id that belongs to another author.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// A convenience type alias for `Result<T, StoryError>`.
pub type StoryResult<T> = Result<T, StoryError>;

impl StoryError {
    /// Translates an error from a storage port.
    pub fn from_storage(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => StoryError::NotFound(what),
            other => StoryError::Persistence(other.to_string()),
        }
    }
}
